//! Error classification for HTTP transfers.

use reqwest::StatusCode;

/// An HTTP response that is not a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpStatusError {
    /// HTTP 401
    Unauthorized,
    /// HTTP 403
    Forbidden,
    /// HTTP 404
    NotFound,
    /// HTTP 429
    RateLimited,
    /// Any other 4xx
    Client(u16),
    /// 5xx
    Server(u16),
    /// Informational or redirect status that was not followed
    Unexpected(u16),
}

impl HttpStatusError {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => HttpStatusError::Unauthorized,
            StatusCode::FORBIDDEN => HttpStatusError::Forbidden,
            StatusCode::NOT_FOUND => HttpStatusError::NotFound,
            StatusCode::TOO_MANY_REQUESTS => HttpStatusError::RateLimited,
            s if s.is_client_error() => HttpStatusError::Client(s.as_u16()),
            s if s.is_server_error() => HttpStatusError::Server(s.as_u16()),
            s => HttpStatusError::Unexpected(s.as_u16()),
        }
    }
}

impl std::fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpStatusError::Unauthorized => write!(f, "Authentication required (HTTP 401)"),
            HttpStatusError::Forbidden => write!(f, "Access forbidden (HTTP 403)"),
            HttpStatusError::NotFound => write!(f, "Installer not found (HTTP 404)"),
            HttpStatusError::RateLimited => {
                write!(f, "Too many requests (HTTP 429). Try again later.")
            }
            HttpStatusError::Client(code) => write!(f, "Request error (HTTP {})", code),
            HttpStatusError::Server(code) => write!(f, "Server error (HTTP {})", code),
            HttpStatusError::Unexpected(code) => {
                write!(f, "Unexpected response (HTTP {}), expected a file", code)
            }
        }
    }
}

impl std::error::Error for HttpStatusError {}

/// Marker error for a transfer aborted through its cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCancelled;

impl std::fmt::Display for TransferCancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transfer cancelled")
    }
}

impl std::error::Error for TransferCancelled {}

/// Passes 2xx responses through; anything else becomes a classified
/// [`HttpStatusError`].
pub fn check_status(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(HttpStatusError::from_status(status).into())
    }
}

/// Whether an error chain ends in a cancellation rather than a fault.
pub fn is_cancelled(error: &anyhow::Error) -> bool {
    error.downcast_ref::<TransferCancelled>().is_some()
}
