use cp_core::error::AppError;

use crate::workflow::WorkflowError;

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        AppError::Upstream(err.to_string())
    }
}
