use thiserror::Error;

use crate::services::ApiError;

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Repository initialization failed: {message}")]
    InitializationError { message: String },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

impl RepositoryError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            RepositoryError::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_conflict)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_unauthorized)
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
