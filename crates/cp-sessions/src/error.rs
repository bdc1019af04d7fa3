use cp_core::error::AppError;

use crate::runtime::AllocationError;

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        AppError::Upstream(err.to_string())
    }
}
