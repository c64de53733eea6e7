use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use tracing::{error, warn};

use crate::domain::error::DomainError;

/// The controller operation a failure belongs to. Each one answers every
/// failure with the same fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchStats,
    UpdatePreferences,
    FetchActivity,
    RecordActivity,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::FetchStats => "Failed to fetch user statistics",
            Operation::UpdatePreferences => "Failed to update user preferences",
            Operation::FetchActivity => "Failed to fetch user activity",
            Operation::RecordActivity => "Failed to record user activity",
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    operation: Operation,
    cause: DomainError,
}

impl ApiError {
    pub fn new(operation: Operation, cause: DomainError) -> Self {
        Self { operation, cause }
    }

    pub fn cause(&self) -> &DomainError {
        &self.cause
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation.failure_message())
    }
}

/// Answer for requests rejected before reaching a controller.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

#[derive(Serialize)]
pub struct ErrorBody {
    success: bool,
    error: &'static str,
}

impl ErrorBody {
    pub fn new(error: &'static str) -> Self {
        Self {
            success: false,
            error,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.cause {
            DomainError::UserNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Forbidden => StatusCode::FORBIDDEN,
            DomainError::StoreUnavailable(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(operation = ?self.operation, cause = %self.cause, "request failed");
        } else {
            warn!(operation = ?self.operation, cause = %self.cause, "request rejected");
        }

        HttpResponse::build(status).json(ErrorBody::new(self.operation.failure_message()))
    }
}

/// Tags service results with the operation they belong to.
pub trait OrFail<T> {
    fn or_fail(self, operation: Operation) -> Result<T, ApiError>;
}

impl<T> OrFail<T> for Result<T, DomainError> {
    fn or_fail(self, operation: Operation) -> Result<T, ApiError> {
        self.map_err(|cause| ApiError::new(operation, cause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn body_never_carries_the_cause() {
        let err = ApiError::new(
            Operation::FetchStats,
            DomainError::Internal("connection refused by 10.0.0.7".into()),
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "Failed to fetch user statistics"})
        );
    }

    #[test]
    fn status_follows_error_kind() {
        let not_found = ApiError::new(
            Operation::UpdatePreferences,
            DomainError::UserNotFound(crate::domain::user::UserId::parse("ghost").unwrap()),
        );
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "Failed to update user preferences");

        let invalid = ApiError::new(Operation::FetchActivity, DomainError::Validation("x".into()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    }
}
