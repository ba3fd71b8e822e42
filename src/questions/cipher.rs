//! Polygon substitution cipher. The vertices of a polygon are labelled with
//! characters; each plaintext character is encrypted as the label `shift`
//! vertices further clockwise. The student encrypts by selecting vertices.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{PuzzleKind, QuestionAction};
use crate::{
    errors::{AppError, AppResult},
    models::domain::QuestionType,
};

pub struct CipherPuzzle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CipherContent {
    pub plaintext: String,
    pub vertices: Vec<char>,
    pub shift: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CipherAnswer {
    pub encrypted: String,
    pub cursor: usize, // plaintext characters consumed so far
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CipherAction {
    SelectVertex { index: usize },
    DeleteLast,
}

impl CipherContent {
    fn plaintext_len(&self) -> usize {
        self.plaintext.chars().count()
    }

    /// The ciphertext a fully correct answer produces.
    pub fn expected_ciphertext(&self) -> String {
        let n = self.vertices.len();
        let shift = self.shift % n.max(1);
        self.plaintext
            .chars()
            .map(|c| {
                self.vertices
                    .iter()
                    .position(|v| *v == c)
                    .map(|i| self.vertices[(i + shift) % n])
                    .unwrap_or(c)
            })
            .collect()
    }
}

impl PuzzleKind for CipherPuzzle {
    const QUESTION_TYPE: QuestionType = QuestionType::Cipher;

    type Content = CipherContent;
    type Answer = CipherAnswer;
    type Action = CipherAction;

    fn validate_content(content: &CipherContent) -> AppResult<()> {
        if content.vertices.len() < 3 {
            return Err(AppError::MalformedContent(format!(
                "cipher polygon needs at least 3 vertices, got {}",
                content.vertices.len()
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = content.vertices.iter().find(|v| !seen.insert(**v)) {
            return Err(AppError::MalformedContent(format!(
                "cipher vertex '{}' appears twice",
                dup
            )));
        }
        if content.plaintext.is_empty() {
            return Err(AppError::MalformedContent(
                "cipher plaintext is empty".to_string(),
            ));
        }
        if let Some(c) = content.plaintext.chars().find(|c| !seen.contains(c)) {
            return Err(AppError::MalformedContent(format!(
                "cipher plaintext character '{}' is not a polygon vertex",
                c
            )));
        }
        Ok(())
    }

    fn initial_answer(_content: &CipherContent) -> CipherAnswer {
        CipherAnswer {
            encrypted: String::new(),
            cursor: 0,
        }
    }

    fn apply(
        content: &CipherContent,
        answer: &CipherAnswer,
        action: CipherAction,
    ) -> AppResult<CipherAnswer> {
        match action {
            CipherAction::SelectVertex { index } => {
                if answer.cursor >= content.plaintext_len() {
                    return Err(AppError::ValidationError(
                        "Every plaintext character is already encrypted".to_string(),
                    ));
                }
                let label = content.vertices.get(index).ok_or_else(|| {
                    AppError::ValidationError(format!(
                        "Vertex {} does not exist on a {}-gon",
                        index,
                        content.vertices.len()
                    ))
                })?;
                let mut encrypted = answer.encrypted.clone();
                encrypted.push(*label);
                Ok(CipherAnswer {
                    encrypted,
                    cursor: answer.cursor + 1,
                })
            }
            CipherAction::DeleteLast => {
                let mut encrypted = answer.encrypted.clone();
                if encrypted.pop().is_none() {
                    return Err(AppError::ValidationError(
                        "Nothing to delete".to_string(),
                    ));
                }
                Ok(CipherAnswer {
                    encrypted,
                    cursor: answer.cursor.saturating_sub(1),
                })
            }
        }
    }

    fn is_solved(content: &CipherContent, answer: &CipherAnswer) -> bool {
        answer.encrypted == content.expected_ciphertext()
    }

    fn validate_answer(content: &CipherContent, answer: &CipherAnswer) -> AppResult<()> {
        let len = answer.encrypted.chars().count();
        if len != answer.cursor || answer.cursor > content.plaintext_len() {
            return Err(AppError::MalformedContent(format!(
                "cipher cursor {} does not fit {} encrypted characters",
                answer.cursor, len
            )));
        }
        if let Some(c) = answer.encrypted.chars().find(|c| !content.vertices.contains(c)) {
            return Err(AppError::MalformedContent(format!(
                "encrypted character '{}' is not a polygon vertex",
                c
            )));
        }
        Ok(())
    }

    fn extract_action(action: QuestionAction) -> Option<CipherAction> {
        match action {
            QuestionAction::Cipher(action) => Some(action),
            _ => None,
        }
    }
}
