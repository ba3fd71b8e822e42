use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A problem as the backend serves it. `content` is the raw, type-specific
/// JSON string and is only interpreted by the matching question model.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub title: String,
    pub question_type: QuestionType,
    pub content: String,
    #[serde(default)]
    pub points: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Copy)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    Cfg,                   // Grammar rules rewriting a shape sequence
    Cipher,                // Polygon substitution cipher
    DecisionTree,          // Walk a tree of decisions to an outcome
    MonsterClassification, // Sort anomaly monsters into categories
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::Cfg,
        QuestionType::Cipher,
        QuestionType::DecisionTree,
        QuestionType::MonsterClassification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Cfg => "cfg",
            QuestionType::Cipher => "cipher",
            QuestionType::DecisionTree => "decisionTree",
            QuestionType::MonsterClassification => "monsterClassification",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the question-type listing endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTypeInfo {
    pub question_type: QuestionType,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
