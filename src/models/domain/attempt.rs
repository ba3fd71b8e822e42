use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One save or submit of a question attempt. Built from the model's current
/// answer and dropped once the round-trip completes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub question_id: String,
    pub duration: u64, // seconds spent solving, across sessions
    pub is_draft: bool,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    pub fn draft(question_id: &str, duration: u64, answer: String) -> Self {
        AttemptRecord {
            question_id: question_id.to_string(),
            duration,
            is_draft: true,
            answer,
            saved_at: None,
        }
    }

    pub fn submission(question_id: &str, duration: u64, answer: String) -> Self {
        AttemptRecord {
            is_draft: false,
            ..Self::draft(question_id, duration, answer)
        }
    }

    /// Key under which the backend deduplicates writes of this record.
    /// Equal for every write of the same question at the same duration.
    pub fn idempotency_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.question_id.as_bytes());
        hasher.update(b":");
        hasher.update(self.duration.to_be_bytes());
        hasher.update(if self.is_draft { b"d" } else { b"s" });
        hex::encode(hasher.finalize())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub is_correct: bool,
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_details: Option<serde_json::Value>,
}
