use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{AttemptRecord, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    pub role: UserRole,
}

/// Body of both the save-draft and submit endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRequest {
    #[validate(length(min = 1))]
    pub question_id: String,
    pub duration: u64,
    pub answer: String,
}

impl From<&AttemptRecord> for AttemptRequest {
    fn from(record: &AttemptRecord) -> Self {
        AttemptRequest {
            question_id: record.question_id.clone(),
            duration: record.duration,
            answer: record.answer.clone(),
        }
    }
}
