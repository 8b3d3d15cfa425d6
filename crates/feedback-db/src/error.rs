use axum::http::StatusCode;
use thiserror::Error;

pub type FeedbackResult<T> = Result<T, FeedbackError>;
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failures of a single load-modify-save cycle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read error: {0}")]
    Read(String),
    #[error("write error: {0}")]
    Write(String),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("comment text is empty")]
    Empty,
    #[error("replacement text is empty")]
    EmptyNewText,
    #[error("comment index is out of range")]
    InvalidIndex,
}

impl ValidationError {
    /// Wire tag reported in the `error` field of a 400 response.
    pub fn tag(&self) -> &'static str {
        match self {
            ValidationError::Empty => "empty",
            ValidationError::EmptyNewText => "empty_newtext",
            ValidationError::InvalidIndex => "invalid_index",
        }
    }
}

impl StoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Read(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Read(_) => "read",
            StoreError::Write(_) => "write",
            StoreError::Validation(_) => "validation",
        }
    }
}
