use std::{collections::HashMap, sync::Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::QuestionType;

/// A freshly generated question that exists only on this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub title: String,
    pub question_type: QuestionType,
    pub content: String,
}

/// Session-scoped hand-off between the view that generates a question and the
/// view that solves it. Entries live for the process only and are consumed on
/// read.
#[derive(Debug, Default)]
pub struct HandoffStore {
    entries: Mutex<HashMap<String, GeneratedQuestion>>,
}

impl HandoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `question` and return the key the solving view should use.
    pub fn put(&self, question: GeneratedQuestion) -> String {
        let key = Uuid::new_v4().to_string();
        self.entries().insert(key.clone(), question);
        key
    }

    pub fn take(&self, key: &str) -> Option<GeneratedQuestion> {
        self.entries().remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, GeneratedQuestion>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
