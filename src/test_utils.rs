#[cfg(test)]
pub mod fixtures {
    use crate::models::domain::{AttemptRecord, Question, QuestionType};

    /// Grammar that grows a tower: S -> block S | roof.
    pub fn cfg_content() -> String {
        serde_json::json!({
            "rules": [
                { "id": "grow", "input": "S", "output": ["block", "S"] },
                { "id": "roof", "input": "S", "output": ["roof"] }
            ],
            "start": ["S"],
            "end": ["block", "block", "roof"]
        })
        .to_string()
    }

    /// Pentagon ABCDE, shift 2, plaintext "BEA" -> "DBC".
    pub fn cipher_content() -> String {
        serde_json::json!({
            "plaintext": "BEA",
            "vertices": ["A", "B", "C", "D", "E"],
            "shift": 2
        })
        .to_string()
    }

    pub fn decision_tree_content() -> String {
        serde_json::json!({
            "root": "root",
            "targetOutcome": "dragon",
            "nodes": {
                "root": {
                    "kind": "decision",
                    "prompt": "Does it have fur?",
                    "branches": [
                        { "label": "yes", "target": "fur" },
                        { "label": "no", "target": "fish" }
                    ]
                },
                "fur": {
                    "kind": "decision",
                    "prompt": "Does it breathe fire?",
                    "branches": [
                        { "label": "no", "target": "cat" },
                        { "label": "yes", "target": "dragon" }
                    ]
                },
                "fish": { "kind": "leaf", "outcome": "fish" },
                "cat": { "kind": "leaf", "outcome": "cat" },
                "dragon": { "kind": "leaf", "outcome": "dragon" }
            }
        })
        .to_string()
    }

    pub fn monster_content() -> String {
        serde_json::json!({
            "monsters": [
                { "id": "m1", "name": "Blob", "traits": { "eyes": "2" } },
                { "id": "m2", "name": "Glitch", "traits": { "eyes": "7" } }
            ],
            "categories": ["normal", "anomaly"],
            "expected": { "m1": "normal", "m2": "anomaly" }
        })
        .to_string()
    }

    pub fn content_for(question_type: QuestionType) -> String {
        match question_type {
            QuestionType::Cfg => cfg_content(),
            QuestionType::Cipher => cipher_content(),
            QuestionType::DecisionTree => decision_tree_content(),
            QuestionType::MonsterClassification => monster_content(),
        }
    }

    pub fn test_question(id: &str, question_type: QuestionType) -> Question {
        Question {
            id: id.to_string(),
            title: format!("Test {} question", question_type),
            question_type,
            content: content_for(question_type),
            points: 10,
            created_at: None,
        }
    }

    pub fn test_draft(question_id: &str, duration: u64, answer: &str) -> AttemptRecord {
        AttemptRecord::draft(question_id, duration, answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use crate::{
        models::domain::QuestionType,
        questions::{build_question, Question as _},
    };

    #[test]
    fn every_fixture_populates_its_model() {
        for question_type in QuestionType::ALL {
            let mut model = build_question(question_type, 10);
            model
                .populate_from_content(&content_for(question_type))
                .unwrap_or_else(|e| panic!("{} fixture should parse: {}", question_type, e));
            assert!(!model.is_solved());
        }
    }

    #[test]
    fn test_question_uses_matching_content() {
        let question = test_question("42", QuestionType::Cipher);
        assert_eq!(question.id, "42");
        assert_eq!(question.content, cipher_content());
    }
}
