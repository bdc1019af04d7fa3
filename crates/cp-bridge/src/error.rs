use cp_core::error::AppError;
use cp_core::ids::UserId;

#[derive(Debug)]
pub enum BridgeError {
    NotConnected(UserId),
    Timeout,
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::NotConnected(user_id) => {
                write!(f, "no extension connection registered for {user_id}")
            }
            BridgeError::Timeout => write!(f, "extension request timed out"),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<BridgeError> for AppError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::NotConnected(_) => AppError::NotConnected(err.to_string()),
            BridgeError::Timeout => AppError::Timeout(err.to_string()),
        }
    }
}
