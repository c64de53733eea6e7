use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error(transparent)]
    RequestError(#[from] gloo_net::Error),
    #[error("Unauthorized")]
    Unauthorized,
}
