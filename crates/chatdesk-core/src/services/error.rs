use thiserror::Error;

/// Failure talking to the backend, classified by what the caller can do about it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Authorization required")]
    Unauthorized,

    #[error("Resource not found")]
    NotFound,

    /// The derived id already exists or the stored version moved on (409/412).
    #[error("Resource conflict")]
    Conflict,

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Request aborted")]
    Aborted,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
