use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::RwLock;

use problemset_client::{
    api::QuestionApi,
    errors::{AppError, AppResult},
    models::{
        domain::{AttemptRecord, Question, QuestionType, QuestionTypeInfo, SubmitResult, User},
        dto::{
            request::{LoginRequest, RegisterRequest},
            response::LoginResponse,
        },
    },
    questions::{
        build_question, AnswerLoad, CfgAction, CipherAction, MonsterAction, Question as _,
        QuestionAction, TreeAction,
    },
    services::{
        AttemptController, AttemptState, GeneratedQuestion, GuardDecision, GuardOutcome,
        LeaveChoice, NavigationGuard, NavigationRequest,
    },
};

/// Backend held in memory. Latest draft per question, counted submits.
#[derive(Default)]
struct InMemoryQuestionApi {
    questions: RwLock<HashMap<String, Question>>,
    drafts: RwLock<HashMap<String, AttemptRecord>>,
    beacons: Mutex<Vec<AttemptRecord>>,
    submit_calls: AtomicUsize,
    fail_submits: AtomicBool,
    slow_saves: AtomicBool,
    writes_in_flight: AtomicUsize,
    max_writes_in_flight: AtomicUsize,
}

impl InMemoryQuestionApi {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn add_question(&self, id: &str, question_type: QuestionType, content: String) {
        self.questions.write().await.insert(
            id.to_string(),
            Question {
                id: id.to_string(),
                title: format!("Question {}", id),
                question_type,
                content,
                points: 10,
                created_at: None,
            },
        );
    }

    async fn add_draft(&self, record: AttemptRecord) {
        self.drafts
            .write()
            .await
            .insert(record.question_id.clone(), record);
    }

    async fn draft(&self, question_id: &str) -> Option<AttemptRecord> {
        self.drafts.read().await.get(question_id).cloned()
    }

    fn begin_write(&self) {
        let now = self.writes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_writes_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn end_write(&self) {
        self.writes_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionApi for InMemoryQuestionApi {
    fn set_token(&self, _token: Option<SecretString>) {}

    async fn fetch_question(&self, question_id: &str) -> AppResult<Question> {
        self.questions
            .read()
            .await
            .get(question_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("question {}", question_id)))
    }

    async fn fetch_latest_draft(&self, question_id: &str) -> AppResult<Option<AttemptRecord>> {
        Ok(self.draft(question_id).await)
    }

    async fn save_draft(&self, record: &AttemptRecord) -> AppResult<()> {
        self.begin_write();
        if self.slow_saves.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.add_draft(record.clone()).await;
        self.end_write();
        Ok(())
    }

    async fn submit_answer(&self, _record: &AttemptRecord) -> AppResult<SubmitResult> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_write();
        // Stay pending for a poll so a concurrent caller can race us.
        tokio::task::yield_now().await;
        self.end_write();
        if self.fail_submits.load(Ordering::SeqCst) {
            return Err(AppError::ContentFetchFailed(
                "connection reset by peer".to_string(),
            ));
        }
        Ok(SubmitResult {
            is_correct: true,
            points: 10,
            scoring_details: None,
        })
    }

    fn send_draft_beacon(&self, record: AttemptRecord) {
        self.beacons.lock().unwrap().push(record);
    }

    async fn list_question_types(&self) -> AppResult<Vec<QuestionTypeInfo>> {
        Ok(Vec::new())
    }

    async fn login(&self, _request: &LoginRequest) -> AppResult<LoginResponse> {
        Err(AppError::Unauthorized("not supported".to_string()))
    }

    async fn register(&self, _request: &RegisterRequest) -> AppResult<User> {
        Err(AppError::Unauthorized("not supported".to_string()))
    }

    async fn logout(&self, _token: &SecretString) -> AppResult<()> {
        Ok(())
    }
}

fn tower_grammar() -> String {
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

fn pentagon_cipher() -> String {
    serde_json::json!({
        "plaintext": "BEA",
        "vertices": ["A", "B", "C", "D", "E"],
        "shift": 2
    })
    .to_string()
}

fn creature_tree() -> String {
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

fn monster_lineup() -> String {
    serde_json::json!({
        "monsters": [
            { "id": "m1", "name": "Blob", "traits": { "eyes": "2" } },
            { "id": "m2", "name": "Glitch", "traits": { "eyes": "7" } },
            { "id": "m3", "name": "Moss", "traits": { "eyes": "2" } }
        ],
        "categories": ["normal", "anomaly"],
        "expected": { "m1": "normal", "m2": "anomaly", "m3": "normal" }
    })
    .to_string()
}

fn grow(position: usize) -> QuestionAction {
    QuestionAction::Cfg(CfgAction::ApplyRule {
        rule_id: "grow".to_string(),
        position,
    })
}

async fn tower_attempt(api: &Arc<InMemoryQuestionApi>) -> AttemptController {
    api.add_question("42", QuestionType::Cfg, tower_grammar()).await;
    let controller = AttemptController::new(api.clone(), "42", 100);
    controller.load().await.unwrap();
    controller
}

#[tokio::test(start_paused = true)]
async fn fresh_question_starts_from_content() {
    let api = InMemoryQuestionApi::new();

    let controller = tower_attempt(&api).await;

    let mut expected = build_question(QuestionType::Cfg, 100);
    expected.populate_from_content(&tower_grammar()).unwrap();
    assert_eq!(controller.state(), AttemptState::Ready);
    assert_eq!(
        controller.serialized_answer().unwrap(),
        expected.serialize_answer().unwrap()
    );
    assert_eq!(controller.current_duration(), 0);
}

#[tokio::test(start_paused = true)]
async fn prior_draft_is_resumed_and_keeps_ticking() {
    let api = InMemoryQuestionApi::new();
    let partial = r#"{"current":["block","S"],"applied":[{"ruleId":"grow","position":0}]}"#;
    api.add_draft(AttemptRecord::draft("42", 120, partial.to_string()))
        .await;

    let controller = tower_attempt(&api).await;

    assert_eq!(controller.serialized_answer().unwrap(), partial);
    assert_eq!(controller.current_duration(), 120);

    tokio::time::advance(Duration::from_secs(15)).await;
    assert_eq!(controller.current_duration(), 135);
}

#[tokio::test]
async fn undo_twice_after_three_actions_leaves_first_action() {
    let api = InMemoryQuestionApi::new();
    let controller = tower_attempt(&api).await;

    controller.apply(grow(0)).unwrap();
    let after_first = controller.serialized_answer().unwrap();
    controller.apply(grow(1)).unwrap();
    controller.apply(grow(2)).unwrap();

    assert!(controller.undo().unwrap());
    assert!(controller.undo().unwrap());

    assert_eq!(controller.serialized_answer().unwrap(), after_first);
}

#[tokio::test]
async fn failed_submit_surfaces_error_and_stays_open() {
    let api = InMemoryQuestionApi::new();
    api.fail_submits.store(true, Ordering::SeqCst);
    let controller = tower_attempt(&api).await;
    controller.apply(grow(0)).unwrap();

    let err = controller.submit().await.unwrap_err();

    assert!(matches!(err, AppError::SubmitFailed(_)));
    assert!(err.is_retryable());
    assert_eq!(controller.state(), AttemptState::Solving);
    assert_eq!(controller.last_error(), Some(err));

    api.fail_submits.store(false, Ordering::SeqCst);
    controller.submit().await.unwrap();
    assert!(matches!(controller.state(), AttemptState::Completed(_)));
    assert_eq!(api.submit_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_submits_reach_the_server_once() {
    let api = InMemoryQuestionApi::new();
    let controller = tower_attempt(&api).await;

    let (first, second) = tokio::join!(controller.submit(), controller.submit());

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::SubmitInFlight(_)))));
    assert_eq!(api.submit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn saved_duration_survives_resume_for_any_pause() {
    for pause in [0u64, 1, 3600] {
        let api = InMemoryQuestionApi::new();
        let first = tower_attempt(&api).await;
        first.apply(grow(0)).unwrap();
        tokio::time::advance(Duration::from_secs(42)).await;
        first.save_draft().await.unwrap();
        let saved = api.draft("42").await.unwrap().duration;

        tokio::time::advance(Duration::from_secs(pause)).await;
        let second = AttemptController::new(api.clone(), "42", 100);
        second.load().await.unwrap();

        assert_eq!(saved, 42);
        assert!(second.current_duration() >= saved);
    }
}

#[tokio::test]
async fn repeated_saves_of_same_moment_are_idempotent() {
    let api = InMemoryQuestionApi::new();
    let controller = tower_attempt(&api).await;
    controller.pause();
    controller.apply(grow(0)).unwrap();

    controller.save_draft().await.unwrap();
    let first = api.draft("42").await.unwrap();
    controller.save_on_hide();
    let beacon = api.beacons.lock().unwrap().pop().unwrap();

    assert_eq!(first.idempotency_key(), beacon.idempotency_key());
    assert_eq!(first.answer, beacon.answer);
}

#[tokio::test]
async fn reset_is_idempotent_and_undoable() {
    let api = InMemoryQuestionApi::new();
    let controller = tower_attempt(&api).await;
    let initial = controller.serialized_answer().unwrap();
    controller.apply(grow(0)).unwrap();
    let grown = controller.serialized_answer().unwrap();

    controller.reset().unwrap();
    controller.reset().unwrap();

    assert_eq!(controller.serialized_answer().unwrap(), initial);
    assert!(controller.undo().unwrap());
    assert_eq!(controller.serialized_answer().unwrap(), grown);
}

#[tokio::test]
async fn new_action_after_undo_clears_redo() {
    let api = InMemoryQuestionApi::new();
    let controller = tower_attempt(&api).await;
    controller.apply(grow(0)).unwrap();
    controller.apply(grow(1)).unwrap();

    assert!(controller.undo().unwrap());
    assert!(controller.can_redo());
    controller
        .apply(QuestionAction::Cfg(CfgAction::ApplyRule {
            rule_id: "roof".to_string(),
            position: 1,
        }))
        .unwrap();

    assert!(!controller.redo().unwrap());
    assert!(controller.undo().unwrap());
    assert!(controller.undo().unwrap());
    assert!(!controller.undo().unwrap());
}

#[tokio::test]
async fn missing_question_is_a_fetch_error() {
    let api = InMemoryQuestionApi::new();
    let controller = AttemptController::new(api.clone(), "404", 100);

    let err = controller.load().await.unwrap_err();

    assert!(matches!(err, AppError::ContentFetchFailed(_)));
    assert!(matches!(controller.state(), AttemptState::Error(_)));

    api.add_question("404", QuestionType::Cfg, tower_grammar()).await;
    controller.load().await.unwrap();
    assert_eq!(controller.state(), AttemptState::Ready);
}

#[test]
fn answers_round_trip_through_serialization() {
    let cases = [
        (
            QuestionType::Cipher,
            pentagon_cipher(),
            vec![
                QuestionAction::Cipher(CipherAction::SelectVertex { index: 3 }),
                QuestionAction::Cipher(CipherAction::SelectVertex { index: 1 }),
            ],
        ),
        (
            QuestionType::DecisionTree,
            creature_tree(),
            vec![
                QuestionAction::DecisionTree(TreeAction::ChooseBranch { index: 0 }),
                QuestionAction::DecisionTree(TreeAction::ChooseBranch { index: 1 }),
            ],
        ),
        (
            QuestionType::MonsterClassification,
            monster_lineup(),
            vec![
                QuestionAction::MonsterClassification(MonsterAction::Classify {
                    monster_id: "m2".to_string(),
                    category: "anomaly".to_string(),
                }),
                QuestionAction::MonsterClassification(MonsterAction::Classify {
                    monster_id: "m1".to_string(),
                    category: "normal".to_string(),
                }),
            ],
        ),
    ];

    for (question_type, content, actions) in cases {
        let mut model = build_question(question_type, 100);
        model.populate_from_content(&content).unwrap();
        for action in actions {
            model.apply_action(action).unwrap();
        }
        let serialized = model.serialize_answer().unwrap();

        let mut restored = build_question(question_type, 100);
        restored.populate_from_content(&content).unwrap();
        assert_eq!(restored.load_answer(&serialized).unwrap(), AnswerLoad::Restored);

        assert_eq!(restored.serialize_answer().unwrap(), serialized);
        assert_eq!(restored.is_solved(), model.is_solved());
    }
}

#[tokio::test]
async fn leaving_with_unsaved_work_saves_through_the_guard() {
    let api = InMemoryQuestionApi::new();
    let controller = Arc::new(tower_attempt(&api).await);
    let mut guard = NavigationGuard::new(controller.clone(), "/questions/42");
    controller.apply(grow(0)).unwrap();

    let decision = guard.intercept(NavigationRequest::Back);
    let outcome = guard.resolve(LeaveChoice::SaveAndLeave).await.unwrap();

    assert!(matches!(decision, GuardDecision::Prompt { .. }));
    assert_eq!(outcome, GuardOutcome::Leave(NavigationRequest::Back));
    assert!(!controller.has_unsaved_changes());
    assert_eq!(
        api.draft("42").await.unwrap().answer,
        controller.serialized_answer().unwrap()
    );
    assert_eq!(guard.intercept(NavigationRequest::Reload), GuardDecision::Proceed);
}

#[tokio::test]
async fn generated_question_cannot_save_and_leave() {
    let api = InMemoryQuestionApi::new();
    let generated = GeneratedQuestion {
        title: "Generated cipher".to_string(),
        question_type: QuestionType::Cipher,
        content: pentagon_cipher(),
    };
    let controller =
        Arc::new(AttemptController::from_generated(api.clone(), generated, 100).unwrap());
    let mut guard = NavigationGuard::new(controller.clone(), "/play/generated");
    controller
        .apply(QuestionAction::Cipher(CipherAction::SelectVertex { index: 3 }))
        .unwrap();

    guard.intercept(NavigationRequest::Back);
    let outcome = guard.resolve(LeaveChoice::SaveAndLeave).await.unwrap();

    assert!(matches!(outcome, GuardOutcome::SaveFailed { .. }));
    assert_eq!(guard.pending(), Some(NavigationRequest::Back));
    assert!(controller.has_unsaved_changes());
    assert!(api.draft("generated").await.is_none());
    assert_eq!(
        guard.resolve(LeaveChoice::LeaveWithoutSaving).await.unwrap(),
        GuardOutcome::Leave(NavigationRequest::Back)
    );
}

#[tokio::test(start_paused = true)]
async fn submit_waits_for_a_draft_save_in_flight() {
    let api = InMemoryQuestionApi::new();
    api.slow_saves.store(true, Ordering::SeqCst);
    let controller = tower_attempt(&api).await;
    controller.apply(grow(0)).unwrap();

    let (saved, submitted) = tokio::join!(controller.save_draft(), controller.submit());

    assert!(saved.is_ok());
    assert!(submitted.is_ok());
    assert!(matches!(controller.state(), AttemptState::Completed(_)));
    assert_eq!(api.submit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.max_writes_in_flight.load(Ordering::SeqCst), 1);
}
