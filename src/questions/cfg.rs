//! Context-free-grammar shape puzzle: rewrite a start sequence of shapes
//! into the target sequence by applying grammar rules one symbol at a time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{PuzzleKind, QuestionAction};
use crate::{
    errors::{AppError, AppResult},
    models::domain::QuestionType,
};

pub struct CfgPuzzle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CfgContent {
    pub rules: Vec<GrammarRule>,
    pub start: Vec<String>,
    pub end: Vec<String>,
}

/// `input -> output`; an empty output erases the symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarRule {
    pub id: String,
    pub input: String,
    pub output: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CfgAnswer {
    pub current: Vec<String>,
    pub applied: Vec<AppliedRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRule {
    pub rule_id: String,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CfgAction {
    #[serde(rename_all = "camelCase")]
    ApplyRule { rule_id: String, position: usize },
}

impl CfgContent {
    pub fn rule(&self, id: &str) -> Option<&GrammarRule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

impl CfgPuzzle {
    /// Positions in `current` where `rule_id` can be applied.
    pub fn applicable_positions(content: &CfgContent, answer: &CfgAnswer, rule_id: &str) -> Vec<usize> {
        let Some(rule) = content.rule(rule_id) else {
            return Vec::new();
        };
        answer
            .current
            .iter()
            .enumerate()
            .filter(|(_, symbol)| **symbol == rule.input)
            .map(|(i, _)| i)
            .collect()
    }

    /// Rebuild an answer from the start sequence and an ordered list of
    /// applied rules.
    pub fn replay(content: &CfgContent, applied: &[AppliedRule]) -> AppResult<CfgAnswer> {
        applied
            .iter()
            .try_fold(Self::initial_answer(content), |answer, step| {
                Self::apply(
                    content,
                    &answer,
                    CfgAction::ApplyRule {
                        rule_id: step.rule_id.clone(),
                        position: step.position,
                    },
                )
            })
    }
}

impl PuzzleKind for CfgPuzzle {
    const QUESTION_TYPE: QuestionType = QuestionType::Cfg;

    type Content = CfgContent;
    type Answer = CfgAnswer;
    type Action = CfgAction;

    fn validate_content(content: &CfgContent) -> AppResult<()> {
        if content.start.is_empty() {
            return Err(AppError::MalformedContent(
                "cfg content has an empty start sequence".to_string(),
            ));
        }
        if content.end.is_empty() {
            return Err(AppError::MalformedContent(
                "cfg content has an empty end sequence".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for rule in &content.rules {
            if rule.input.is_empty() {
                return Err(AppError::MalformedContent(format!(
                    "cfg rule '{}' has an empty input symbol",
                    rule.id
                )));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(AppError::MalformedContent(format!(
                    "cfg rule id '{}' is used twice",
                    rule.id
                )));
            }
        }
        Ok(())
    }

    fn initial_answer(content: &CfgContent) -> CfgAnswer {
        CfgAnswer {
            current: content.start.clone(),
            applied: Vec::new(),
        }
    }

    fn apply(content: &CfgContent, answer: &CfgAnswer, action: CfgAction) -> AppResult<CfgAnswer> {
        let CfgAction::ApplyRule { rule_id, position } = action;
        let rule = content
            .rule(&rule_id)
            .ok_or_else(|| AppError::ValidationError(format!("Unknown rule '{}'", rule_id)))?;

        match answer.current.get(position) {
            Some(symbol) if *symbol == rule.input => {}
            Some(symbol) => {
                return Err(AppError::ValidationError(format!(
                    "Rule '{}' rewrites '{}', found '{}' at position {}",
                    rule_id, rule.input, symbol, position
                )))
            }
            None => {
                return Err(AppError::ValidationError(format!(
                    "Position {} is outside the sequence of length {}",
                    position,
                    answer.current.len()
                )))
            }
        }

        let mut current = Vec::with_capacity(answer.current.len() + rule.output.len());
        current.extend_from_slice(&answer.current[..position]);
        current.extend(rule.output.iter().cloned());
        current.extend_from_slice(&answer.current[position + 1..]);

        let mut applied = answer.applied.clone();
        applied.push(AppliedRule { rule_id, position });

        Ok(CfgAnswer { current, applied })
    }

    fn is_solved(content: &CfgContent, answer: &CfgAnswer) -> bool {
        answer.current == content.end
    }

    fn validate_answer(content: &CfgContent, answer: &CfgAnswer) -> AppResult<()> {
        let replayed = Self::replay(content, &answer.applied)?;
        if replayed.current != answer.current {
            return Err(AppError::MalformedContent(
                "saved sequence does not match its applied rules".to_string(),
            ));
        }
        Ok(())
    }

    fn extract_action(action: QuestionAction) -> Option<CfgAction> {
        match action {
            QuestionAction::Cfg(action) => Some(action),
            _ => None,
        }
    }
}
