//! Question models: one contract for every puzzle type.
//!
//! A [`PuzzleKind`] supplies the type-specific pieces (content parser,
//! initial answer, action semantics). [`QuestionModel`] wraps any kind with
//! the shared lifecycle: hydrate from server content, load a saved answer,
//! serialize, reset, and bounded undo/redo. [`build_question`] is the single
//! switch from a [`QuestionType`] tag to a boxed [`Question`].

pub mod cfg;
pub mod cipher;
pub mod decision_tree;
pub mod history;
pub mod monster;

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    errors::{AppError, AppResult},
    models::domain::QuestionType,
};

pub use cfg::{CfgAction, CfgPuzzle};
pub use cipher::{CipherAction, CipherPuzzle};
pub use decision_tree::{DecisionTreePuzzle, TreeAction};
pub use history::History;
pub use monster::{MonsterAction, MonsterPuzzle};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Type-specific half of a question model.
pub trait PuzzleKind: Send + Sync + 'static {
    const QUESTION_TYPE: QuestionType;

    type Content: DeserializeOwned + Clone + fmt::Debug + Send + Sync;
    type Answer: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync;
    type Action: Clone + fmt::Debug + Send;

    /// Semantic checks that serde cannot express (unique ids, dangling refs).
    fn validate_content(content: &Self::Content) -> AppResult<()>;

    fn initial_answer(content: &Self::Content) -> Self::Answer;

    /// Compute the answer after `action`, or reject it. Never mutates.
    fn apply(
        content: &Self::Content,
        answer: &Self::Answer,
        action: Self::Action,
    ) -> AppResult<Self::Answer>;

    fn is_solved(content: &Self::Content, answer: &Self::Answer) -> bool;

    /// Whether a deserialized answer is consistent with `content`.
    fn validate_answer(_content: &Self::Content, _answer: &Self::Answer) -> AppResult<()> {
        Ok(())
    }

    fn extract_action(action: QuestionAction) -> Option<Self::Action>;

    fn parse_content(raw: &str) -> AppResult<Self::Content> {
        let content: Self::Content = serde_json::from_str(raw).map_err(|e| {
            AppError::MalformedContent(format!("{} content: {}", Self::QUESTION_TYPE, e))
        })?;
        Self::validate_content(&content)?;
        Ok(content)
    }
}

/// Any puzzle's mutating action, tagged by puzzle type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "questionType", content = "action", rename_all = "camelCase")]
pub enum QuestionAction {
    Cfg(CfgAction),
    Cipher(CipherAction),
    DecisionTree(TreeAction),
    MonsterClassification(MonsterAction),
}

impl QuestionAction {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionAction::Cfg(_) => QuestionType::Cfg,
            QuestionAction::Cipher(_) => QuestionType::Cipher,
            QuestionAction::DecisionTree(_) => QuestionType::DecisionTree,
            QuestionAction::MonsterClassification(_) => QuestionType::MonsterClassification,
        }
    }
}

/// How `load_answer` ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerLoad {
    Restored,
    FellBackToInitial { reason: String },
}

/// The uniform, object-safe contract the attempt controller works against.
pub trait Question: Send + Sync {
    fn question_type(&self) -> QuestionType;
    fn is_loaded(&self) -> bool;
    fn populate_from_content(&mut self, raw: &str) -> AppResult<()>;
    fn load_answer(&mut self, raw: &str) -> AppResult<AnswerLoad>;
    fn serialize_answer(&self) -> AppResult<String>;
    fn reset_to_initial(&mut self) -> AppResult<()>;
    fn undo(&mut self) -> bool;
    fn redo(&mut self) -> bool;
    fn can_undo(&self) -> bool;
    fn can_redo(&self) -> bool;
    fn apply_action(&mut self, action: QuestionAction) -> AppResult<()>;
    fn is_solved(&self) -> bool;
}

struct Loaded<K: PuzzleKind> {
    content: K::Content,
    answer: K::Answer,
}

pub struct QuestionModel<K: PuzzleKind> {
    loaded: Option<Loaded<K>>,
    history: History<K::Answer>,
}

impl<K: PuzzleKind> QuestionModel<K> {
    pub fn new(history_limit: usize) -> Self {
        Self {
            loaded: None,
            history: History::new(history_limit),
        }
    }

    pub fn content(&self) -> Option<&K::Content> {
        self.loaded.as_ref().map(|l| &l.content)
    }

    pub fn answer(&self) -> Option<&K::Answer> {
        self.loaded.as_ref().map(|l| &l.answer)
    }

    /// Apply a type-specific action, recording the previous answer for undo.
    /// A rejected action leaves answer and history untouched.
    pub fn apply(&mut self, action: K::Action) -> AppResult<()> {
        let loaded = self.loaded_mut()?;
        let next = K::apply(&loaded.content, &loaded.answer, action)?;
        if next == loaded.answer {
            return Ok(());
        }
        let previous = std::mem::replace(&mut loaded.answer, next);
        self.history.record(previous);
        Ok(())
    }

    fn loaded_mut(&mut self) -> AppResult<&mut Loaded<K>> {
        self.loaded.as_mut().ok_or_else(not_loaded::<K>)
    }

    fn loaded_ref(&self) -> AppResult<&Loaded<K>> {
        self.loaded.as_ref().ok_or_else(not_loaded::<K>)
    }

    fn parse_answer(content: &K::Content, raw: &str) -> Result<K::Answer, String> {
        if raw.trim().is_empty() {
            return Err("saved answer is empty".to_string());
        }
        let answer: K::Answer = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        K::validate_answer(content, &answer).map_err(|e| e.to_string())?;
        Ok(answer)
    }
}

impl<K: PuzzleKind> Default for QuestionModel<K> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

fn not_loaded<K: PuzzleKind>() -> AppError {
    AppError::ValidationError(format!("{} question has no content loaded", K::QUESTION_TYPE))
}

impl<K: PuzzleKind> Question for QuestionModel<K> {
    fn question_type(&self) -> QuestionType {
        K::QUESTION_TYPE
    }

    fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn populate_from_content(&mut self, raw: &str) -> AppResult<()> {
        let content = K::parse_content(raw)?;
        let answer = K::initial_answer(&content);
        self.loaded = Some(Loaded { content, answer });
        self.history.clear();
        Ok(())
    }

    fn load_answer(&mut self, raw: &str) -> AppResult<AnswerLoad> {
        let loaded = self.loaded_mut()?;
        let outcome = match Self::parse_answer(&loaded.content, raw) {
            Ok(answer) => {
                loaded.answer = answer;
                AnswerLoad::Restored
            }
            Err(reason) => {
                log::warn!(
                    "Discarding saved {} answer, starting over: {}",
                    K::QUESTION_TYPE,
                    reason
                );
                loaded.answer = K::initial_answer(&loaded.content);
                AnswerLoad::FellBackToInitial { reason }
            }
        };
        self.history.clear();
        Ok(outcome)
    }

    fn serialize_answer(&self) -> AppResult<String> {
        let loaded = self.loaded_ref()?;
        serde_json::to_string(&loaded.answer)
            .map_err(|e| AppError::InternalError(format!("Failed to serialize answer: {}", e)))
    }

    fn reset_to_initial(&mut self) -> AppResult<()> {
        let loaded = self.loaded_mut()?;
        let initial = K::initial_answer(&loaded.content);
        if initial == loaded.answer {
            return Ok(());
        }
        let previous = std::mem::replace(&mut loaded.answer, initial);
        self.history.record(previous);
        Ok(())
    }

    fn undo(&mut self) -> bool {
        let Some(loaded) = self.loaded.as_mut() else {
            return false;
        };
        if !self.history.can_undo() {
            return false;
        }
        let current = loaded.answer.clone();
        match self.history.undo(current) {
            Some(previous) => {
                loaded.answer = previous;
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        let Some(loaded) = self.loaded.as_mut() else {
            return false;
        };
        if !self.history.can_redo() {
            return false;
        }
        let current = loaded.answer.clone();
        match self.history.redo(current) {
            Some(next) => {
                loaded.answer = next;
                true
            }
            None => false,
        }
    }

    fn can_undo(&self) -> bool {
        self.loaded.is_some() && self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.loaded.is_some() && self.history.can_redo()
    }

    fn apply_action(&mut self, action: QuestionAction) -> AppResult<()> {
        let action_type = action.question_type();
        let action = K::extract_action(action).ok_or_else(|| {
            AppError::ValidationError(format!(
                "{} action sent to a {} question",
                action_type,
                K::QUESTION_TYPE
            ))
        })?;
        self.apply(action)
    }

    fn is_solved(&self) -> bool {
        self.loaded
            .as_ref()
            .map(|l| K::is_solved(&l.content, &l.answer))
            .unwrap_or(false)
    }
}

/// Pick the model for a question type.
pub fn build_question(question_type: QuestionType, history_limit: usize) -> Box<dyn Question> {
    match question_type {
        QuestionType::Cfg => Box::new(QuestionModel::<CfgPuzzle>::new(history_limit)),
        QuestionType::Cipher => Box::new(QuestionModel::<CipherPuzzle>::new(history_limit)),
        QuestionType::DecisionTree => {
            Box::new(QuestionModel::<DecisionTreePuzzle>::new(history_limit))
        }
        QuestionType::MonsterClassification => {
            Box::new(QuestionModel::<MonsterPuzzle>::new(history_limit))
        }
    }
}
