use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Malformed content: {0}")]
    MalformedContent(String),

    #[error("Content fetch failed: {0}")]
    ContentFetchFailed(String),

    #[error("Submit failed: {0}")]
    SubmitFailed(String),

    #[error("A submission is already in flight for question {0}")]
    SubmitInFlight(String),

    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MalformedContent(_) => "MALFORMED_CONTENT",
            AppError::ContentFetchFailed(_) => "CONTENT_FETCH_FAILED",
            AppError::SubmitFailed(_) => "SUBMIT_FAILED",
            AppError::SubmitInFlight(_) => "SUBMIT_IN_FLIGHT",
            AppError::SaveFailed(_) => "SAVE_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the user can retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ContentFetchFailed(_) | AppError::SubmitFailed(_) | AppError::SaveFailed(_)
        )
    }
}

/// What the presentation layer gets to show for a failed operation.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub retryable: bool,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            error: err.to_string(),
            code: err.error_code(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedContent(err.to_string())
    }
}
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            AppError::Unauthorized(err.to_string())
        } else {
            AppError::ContentFetchFailed(err.to_string())
        }
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(format!("Storage error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
