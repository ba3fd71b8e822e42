use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AttemptRecord, User},
};

/// JSON envelope every backend endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// Unwrap the payload, treating a missing one as a malformed response.
    pub fn into_data(self) -> AppResult<T> {
        self.data.ok_or_else(|| {
            AppError::MalformedContent(if self.message.is_empty() {
                "response envelope has no data".to_string()
            } else {
                format!("response envelope has no data: {}", self.message)
            })
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Latest stored draft, in the shape drafts are saved with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub question_id: String,
    pub duration: u64,
    pub answer: String,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl From<DraftResponse> for AttemptRecord {
    fn from(draft: DraftResponse) -> Self {
        AttemptRecord {
            saved_at: draft.saved_at,
            ..AttemptRecord::draft(&draft.question_id, draft.duration, draft.answer)
        }
    }
}
