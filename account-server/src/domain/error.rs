use thiserror::Error;

use crate::domain::user::UserId;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("forbidden")]
    Forbidden,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<mongodb::error::Error> for DomainError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match *err.kind {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } => {
                DomainError::StoreUnavailable(err.to_string())
            }
            _ => DomainError::Internal(format!("database error: {err}")),
        }
    }
}
