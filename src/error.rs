//! Error types for listing fetches.

use thiserror::Error;

/// Why a listing request produced no page.
///
/// Kept `Clone` so a failed view state can be published to every subscriber.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("market returned status {status}")]
    Status { status: u16 },

    #[error("unreadable market response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether offering the user a retry makes sense
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout => true,
            FetchError::Status { status } => *status >= 500 || *status == 429,
            FetchError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Result type alias for listing fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
