//! Decision tree walk: starting at the root, choose a branch at each decision
//! node until a leaf is reached.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{PuzzleKind, QuestionAction};
use crate::{
    errors::{AppError, AppResult},
    models::domain::QuestionType,
};

pub struct DecisionTreePuzzle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TreeContent {
    pub root: String,
    pub nodes: BTreeMap<String, TreeNode>,
    #[serde(default)]
    pub target_outcome: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TreeNode {
    Decision { prompt: String, branches: Vec<Branch> },
    Leaf { outcome: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub label: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TreeAnswer {
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeAction {
    ChooseBranch { index: usize },
    StepBack,
}

impl TreeAnswer {
    pub fn current_node(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

impl TreeContent {
    fn branches_of(&self, node_id: &str) -> Option<&[Branch]> {
        match self.nodes.get(node_id)? {
            TreeNode::Decision { branches, .. } => Some(branches),
            TreeNode::Leaf { .. } => None,
        }
    }
}

impl PuzzleKind for DecisionTreePuzzle {
    const QUESTION_TYPE: QuestionType = QuestionType::DecisionTree;

    type Content = TreeContent;
    type Answer = TreeAnswer;
    type Action = TreeAction;

    fn validate_content(content: &TreeContent) -> AppResult<()> {
        if !content.nodes.contains_key(&content.root) {
            return Err(AppError::MalformedContent(format!(
                "decision tree root '{}' is not a node",
                content.root
            )));
        }
        for (id, node) in &content.nodes {
            let TreeNode::Decision { branches, .. } = node else {
                continue;
            };
            if branches.is_empty() {
                return Err(AppError::MalformedContent(format!(
                    "decision node '{}' has no branches",
                    id
                )));
            }
            if let Some(branch) = branches.iter().find(|b| !content.nodes.contains_key(&b.target)) {
                return Err(AppError::MalformedContent(format!(
                    "branch '{}' of node '{}' points at unknown node '{}'",
                    branch.label, id, branch.target
                )));
            }
        }
        Ok(())
    }

    fn initial_answer(content: &TreeContent) -> TreeAnswer {
        TreeAnswer {
            path: vec![content.root.clone()],
        }
    }

    fn apply(content: &TreeContent, answer: &TreeAnswer, action: TreeAction) -> AppResult<TreeAnswer> {
        let current = answer
            .current_node()
            .ok_or_else(|| AppError::ValidationError("Decision path is empty".to_string()))?;
        match action {
            TreeAction::ChooseBranch { index } => {
                let branches = content.branches_of(current).ok_or_else(|| {
                    AppError::ValidationError(format!("Node '{}' is a leaf", current))
                })?;
                let branch = branches.get(index).ok_or_else(|| {
                    AppError::ValidationError(format!(
                        "Node '{}' has {} branches, no branch {}",
                        current,
                        branches.len(),
                        index
                    ))
                })?;
                let mut path = answer.path.clone();
                path.push(branch.target.clone());
                Ok(TreeAnswer { path })
            }
            TreeAction::StepBack => {
                if answer.path.len() <= 1 {
                    return Err(AppError::ValidationError(
                        "Already at the root".to_string(),
                    ));
                }
                let mut path = answer.path.clone();
                path.pop();
                Ok(TreeAnswer { path })
            }
        }
    }

    fn is_solved(content: &TreeContent, answer: &TreeAnswer) -> bool {
        let Some(TreeNode::Leaf { outcome }) = answer
            .current_node()
            .and_then(|id| content.nodes.get(id))
        else {
            return false;
        };
        content
            .target_outcome
            .as_ref()
            .map_or(true, |target| target == outcome)
    }

    fn validate_answer(content: &TreeContent, answer: &TreeAnswer) -> AppResult<()> {
        if answer.path.first() != Some(&content.root) {
            return Err(AppError::MalformedContent(
                "decision path does not start at the root".to_string(),
            ));
        }
        for pair in answer.path.windows(2) {
            let reachable = content
                .branches_of(&pair[0])
                .is_some_and(|branches| branches.iter().any(|b| b.target == pair[1]));
            if !reachable {
                return Err(AppError::MalformedContent(format!(
                    "no branch leads from '{}' to '{}'",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(())
    }

    fn extract_action(action: QuestionAction) -> Option<TreeAction> {
        match action {
            QuestionAction::DecisionTree(action) => Some(action),
            _ => None,
        }
    }
}
