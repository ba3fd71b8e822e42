//! Anomaly monster classification: assign each monster to one category.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{PuzzleKind, QuestionAction};
use crate::{
    errors::{AppError, AppResult},
    models::domain::QuestionType,
};

pub struct MonsterPuzzle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MonsterContent {
    pub monsters: Vec<Monster>,
    pub categories: Vec<String>,
    #[serde(default)]
    pub expected: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub traits: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonsterAnswer {
    pub assignments: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonsterAction {
    #[serde(rename_all = "camelCase")]
    Classify { monster_id: String, category: String },
    #[serde(rename_all = "camelCase")]
    Unclassify { monster_id: String },
}

impl MonsterContent {
    fn has_monster(&self, id: &str) -> bool {
        self.monsters.iter().any(|m| m.id == id)
    }

    fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

impl PuzzleKind for MonsterPuzzle {
    const QUESTION_TYPE: QuestionType = QuestionType::MonsterClassification;

    type Content = MonsterContent;
    type Answer = MonsterAnswer;
    type Action = MonsterAction;

    fn validate_content(content: &MonsterContent) -> AppResult<()> {
        if content.monsters.is_empty() {
            return Err(AppError::MalformedContent("no monsters to classify".to_string()));
        }
        if content.categories.is_empty() {
            return Err(AppError::MalformedContent("no categories to classify into".to_string()));
        }
        let mut ids = HashSet::new();
        for monster in &content.monsters {
            if !ids.insert(monster.id.as_str()) {
                return Err(AppError::MalformedContent(format!(
                    "monster id '{}' appears twice",
                    monster.id
                )));
            }
        }
        let mut categories = HashSet::new();
        for category in &content.categories {
            if !categories.insert(category.as_str()) {
                return Err(AppError::MalformedContent(format!(
                    "category '{}' appears twice",
                    category
                )));
            }
        }
        if let Some(expected) = &content.expected {
            for (monster_id, category) in expected {
                if !ids.contains(monster_id.as_str()) || !categories.contains(category.as_str()) {
                    return Err(AppError::MalformedContent(format!(
                        "expected classification '{}' -> '{}' refers to unknown ids",
                        monster_id, category
                    )));
                }
            }
        }
        Ok(())
    }

    fn initial_answer(_content: &MonsterContent) -> MonsterAnswer {
        MonsterAnswer::default()
    }

    fn apply(
        content: &MonsterContent,
        answer: &MonsterAnswer,
        action: MonsterAction,
    ) -> AppResult<MonsterAnswer> {
        let mut next = answer.clone();
        match action {
            MonsterAction::Classify {
                monster_id,
                category,
            } => {
                if !content.has_monster(&monster_id) {
                    return Err(AppError::ValidationError(format!(
                        "Unknown monster '{}'",
                        monster_id
                    )));
                }
                if !content.has_category(&category) {
                    return Err(AppError::ValidationError(format!(
                        "Unknown category '{}'",
                        category
                    )));
                }
                next.assignments.insert(monster_id, category);
            }
            MonsterAction::Unclassify { monster_id } => {
                if next.assignments.remove(&monster_id).is_none() {
                    return Err(AppError::ValidationError(format!(
                        "Monster '{}' is not classified",
                        monster_id
                    )));
                }
            }
        }
        Ok(next)
    }

    fn is_solved(content: &MonsterContent, answer: &MonsterAnswer) -> bool {
        let all_assigned = content
            .monsters
            .iter()
            .all(|m| answer.assignments.contains_key(&m.id));
        match &content.expected {
            Some(expected) => all_assigned && *expected == answer.assignments,
            None => all_assigned,
        }
    }

    fn validate_answer(content: &MonsterContent, answer: &MonsterAnswer) -> AppResult<()> {
        for (monster_id, category) in &answer.assignments {
            if !content.has_monster(monster_id) || !content.has_category(category) {
                return Err(AppError::MalformedContent(format!(
                    "saved classification '{}' -> '{}' does not match the puzzle",
                    monster_id, category
                )));
            }
        }
        Ok(())
    }

    fn extract_action(action: QuestionAction) -> Option<MonsterAction> {
        match action {
            QuestionAction::MonsterClassification(action) => Some(action),
            _ => None,
        }
    }
}
