use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountClientError {
    #[cfg(feature = "http")]
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Not found")]
    NotFound,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AccountClientError {
    /// Maps a non-success status and the server's `{success, error}` body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<crate::dto::ErrorResponse>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.trim().to_string());

        match status {
            401 => AccountClientError::Unauthorized,
            404 => AccountClientError::NotFound,
            _ => AccountClientError::Http { status, message },
        }
    }

    #[cfg(feature = "http")]
    pub async fn from_http_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        match resp.text().await {
            Ok(body) => Self::from_status(status, &body),
            Err(err) => AccountClientError::RequestError(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_surfaced() {
        let err = AccountClientError::from_status(
            500,
            r#"{"success":false,"error":"Failed to fetch user statistics"}"#,
        );
        assert_eq!(err.to_string(), "HTTP error 500: Failed to fetch user statistics");
    }

    #[test]
    fn auth_and_missing_map_to_variants() {
        assert!(matches!(
            AccountClientError::from_status(401, "{}"),
            AccountClientError::Unauthorized
        ));
        assert!(matches!(
            AccountClientError::from_status(404, ""),
            AccountClientError::NotFound
        ));
    }
}
