//! Lifecycle of one question attempt: fetch, resume the latest draft, track
//! solving time, autosave, and submit exactly once.
//!
//! Network calls never run under the session lock, so the presentation layer
//! can keep reading state (and the user can keep solving) while a save is in
//! flight. Every mutation and its undo-history push happen under a single
//! lock acquisition. Draft saves and the submit share one write lock, so at
//! most one attempt record is in flight at a time.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use async_trait::async_trait;
use tokio::sync::Mutex as WriteLock;

use crate::{
    api::QuestionApi,
    errors::{AppError, AppResult},
    models::domain::{AttemptRecord, QuestionType, SubmitResult},
    questions::{build_question, AnswerLoad, Question, QuestionAction},
    services::{
        duration::DurationTracker, handoff::GeneratedQuestion, navigation_guard::DraftSaver,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Loading,
    Ready,
    Solving,
    Saving,
    Submitting,
    Completed(SubmitResult),
    Error(AppError),
}

impl AttemptState {
    /// States in which the answer may still change.
    fn is_open(&self) -> bool {
        matches!(
            self,
            AttemptState::Ready | AttemptState::Solving | AttemptState::Saving
        )
    }

    /// States from which a new record write may start.
    fn is_writable(&self) -> bool {
        matches!(self, AttemptState::Ready | AttemptState::Solving)
    }
}

struct Session {
    state: AttemptState,
    model: Option<Box<dyn Question>>,
    title: Option<String>,
    duration: DurationTracker,
    revision: u64,
    saved_revision: u64,
    last_error: Option<AppError>,
    notice: Option<String>,
}

impl Session {
    fn new() -> Self {
        Self {
            state: AttemptState::Loading,
            model: None,
            title: None,
            duration: DurationTracker::default(),
            revision: 0,
            saved_revision: 0,
            last_error: None,
            notice: None,
        }
    }

    fn has_unsaved_changes(&self) -> bool {
        self.revision != self.saved_revision
    }

    fn open_model(&mut self) -> AppResult<&mut Box<dyn Question>> {
        if !self.state.is_open() {
            return Err(AppError::ValidationError(format!(
                "Attempt cannot be changed while {}",
                state_name(&self.state)
            )));
        }
        self.model
            .as_mut()
            .ok_or_else(|| AppError::ValidationError("Question is not loaded".to_string()))
    }

    fn touch(&mut self) {
        self.revision += 1;
        if self.state == AttemptState::Ready {
            self.state = AttemptState::Solving;
        }
    }
}

fn state_name(state: &AttemptState) -> &'static str {
    match state {
        AttemptState::Loading => "loading",
        AttemptState::Ready => "ready",
        AttemptState::Solving => "solving",
        AttemptState::Saving => "saving",
        AttemptState::Submitting => "submitting",
        AttemptState::Completed(_) => "completed",
        AttemptState::Error(_) => "in error",
    }
}

fn fetch_failed(err: AppError) -> AppError {
    match err {
        AppError::ContentFetchFailed(_) => err,
        other => AppError::ContentFetchFailed(other.to_string()),
    }
}

/// Clears the in-flight submit flag however the submit future ends.
struct SubmitGate<'a>(&'a AtomicBool);

impl Drop for SubmitGate<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct AttemptController {
    api: Arc<dyn QuestionApi>,
    question_id: String,
    history_limit: usize,
    persisted: bool,
    session: Mutex<Session>,
    writes: WriteLock<()>,
    submitting: AtomicBool,
}

impl AttemptController {
    pub fn new(api: Arc<dyn QuestionApi>, question_id: &str, history_limit: usize) -> Self {
        Self {
            api,
            question_id: question_id.to_string(),
            history_limit,
            persisted: true,
            session: Mutex::new(Session::new()),
            writes: WriteLock::new(()),
            submitting: AtomicBool::new(false),
        }
    }

    /// Start a session for a question generated on this client. It has no
    /// server copy: drafts are not saved and submission is scored locally.
    pub fn from_generated(
        api: Arc<dyn QuestionApi>,
        generated: GeneratedQuestion,
        history_limit: usize,
    ) -> AppResult<Self> {
        let mut model = build_question(generated.question_type, history_limit);
        model.populate_from_content(&generated.content)?;

        let controller = Self {
            persisted: false,
            ..Self::new(api, "generated", history_limit)
        };
        {
            let mut session = controller.session();
            session.model = Some(model);
            session.title = Some(generated.title);
            session.duration = DurationTracker::started(0);
            session.state = AttemptState::Ready;
        }
        Ok(controller)
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fail(&self, err: AppError) -> AppError {
        log::error!("Attempt on question {} failed: {}", self.question_id, err);
        let mut session = self.session();
        session.state = AttemptState::Error(err.clone());
        session.last_error = Some(err.clone());
        err
    }

    /// Fetch the question and resume the latest draft if there is one.
    /// Callable again from the error state to retry.
    pub async fn load(&self) -> AppResult<()> {
        {
            let mut session = self.session();
            if !matches!(session.state, AttemptState::Loading | AttemptState::Error(_)) {
                return Err(AppError::ValidationError(format!(
                    "Question {} is already {}",
                    self.question_id,
                    state_name(&session.state)
                )));
            }
            session.state = AttemptState::Loading;
            session.last_error = None;
        }

        let question = match self.api.fetch_question(&self.question_id).await {
            Ok(question) => question,
            Err(e) => return Err(self.fail(fetch_failed(e))),
        };

        let mut model = build_question(question.question_type, self.history_limit);
        if let Err(e) = model.populate_from_content(&question.content) {
            return Err(self.fail(e));
        }

        let draft = match self.api.fetch_latest_draft(&self.question_id).await {
            Ok(draft) => draft,
            Err(e) => return Err(self.fail(fetch_failed(e))),
        };

        let mut notice = None;
        let accumulated = match draft {
            Some(draft) => {
                match model.load_answer(&draft.answer)? {
                    AnswerLoad::Restored => log::info!(
                        "Resuming draft for question {} at {}s",
                        self.question_id,
                        draft.duration
                    ),
                    AnswerLoad::FellBackToInitial { reason } => {
                        notice = Some(format!(
                            "Your saved progress could not be restored ({}); starting over.",
                            reason
                        ));
                    }
                }
                draft.duration
            }
            None => 0,
        };

        let mut session = self.session();
        session.model = Some(model);
        session.title = Some(question.title);
        session.duration = DurationTracker::started(accumulated);
        session.revision = 0;
        session.saved_revision = 0;
        session.notice = notice;
        session.state = AttemptState::Ready;
        Ok(())
    }

    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn state(&self) -> AttemptState {
        self.session().state.clone()
    }

    pub fn title(&self) -> Option<String> {
        self.session().title.clone()
    }

    pub fn question_type(&self) -> Option<QuestionType> {
        self.session().model.as_ref().map(|m| m.question_type())
    }

    /// Error from the last failed load or submit, for the presentation layer.
    pub fn last_error(&self) -> Option<AppError> {
        self.session().last_error.clone()
    }

    /// Non-fatal message for the user, e.g. a saved draft that was discarded.
    pub fn notice(&self) -> Option<String> {
        self.session().notice.clone()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.session().has_unsaved_changes()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Seconds spent on this question, including earlier sessions.
    pub fn current_duration(&self) -> u64 {
        self.session().duration.seconds()
    }

    /// Stop the clock, e.g. while the page is hidden.
    pub fn pause(&self) {
        self.session().duration.pause();
    }

    pub fn resume(&self) {
        let mut session = self.session();
        if session.state.is_open() {
            session.duration.resume();
        }
    }

    pub fn serialized_answer(&self) -> AppResult<String> {
        self.session()
            .model
            .as_ref()
            .ok_or_else(|| AppError::ValidationError("Question is not loaded".to_string()))?
            .serialize_answer()
    }

    pub fn is_solved(&self) -> bool {
        self.session()
            .model
            .as_ref()
            .map(|m| m.is_solved())
            .unwrap_or(false)
    }

    pub fn can_undo(&self) -> bool {
        let session = self.session();
        session.state.is_open() && session.model.as_ref().is_some_and(|m| m.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        let session = self.session();
        session.state.is_open() && session.model.as_ref().is_some_and(|m| m.can_redo())
    }

    pub fn apply(&self, action: QuestionAction) -> AppResult<()> {
        let mut session = self.session();
        session.open_model()?.apply_action(action)?;
        session.touch();
        Ok(())
    }

    pub fn undo(&self) -> AppResult<bool> {
        let mut session = self.session();
        let undone = session.open_model()?.undo();
        if undone {
            session.touch();
        }
        Ok(undone)
    }

    pub fn redo(&self) -> AppResult<bool> {
        let mut session = self.session();
        let redone = session.open_model()?.redo();
        if redone {
            session.touch();
        }
        Ok(redone)
    }

    pub fn reset(&self) -> AppResult<()> {
        let mut session = self.session();
        let model = session.open_model()?;
        let before = model.serialize_answer()?;
        model.reset_to_initial()?;
        if model.serialize_answer()? != before {
            session.touch();
        }
        Ok(())
    }

    /// The record a save or submit right now would send.
    pub fn snapshot(&self, is_draft: bool) -> AppResult<AttemptRecord> {
        let session = self.session();
        self.snapshot_locked(&session, is_draft)
    }

    fn snapshot_locked(&self, session: &Session, is_draft: bool) -> AppResult<AttemptRecord> {
        let answer = session
            .model
            .as_ref()
            .ok_or_else(|| AppError::ValidationError("Question is not loaded".to_string()))?
            .serialize_answer()?;
        let duration = session.duration.seconds();
        Ok(if is_draft {
            AttemptRecord::draft(&self.question_id, duration, answer)
        } else {
            AttemptRecord::submission(&self.question_id, duration, answer)
        })
    }

    /// Awaited draft save, used on teardown, autosave ticks and by the
    /// navigation guard. `Ok` means the current answer is stored on the server
    /// or there was nothing unsaved; anything else is `SaveFailed`.
    pub async fn save_draft(&self) -> AppResult<()> {
        let _write = self.writes.lock().await;

        let (record, revision) = {
            let mut session = self.session();
            if session.model.is_none() || !session.state.is_writable() || !self.persisted {
                if !session.has_unsaved_changes() {
                    return Ok(());
                }
                let reason = if !self.persisted {
                    "generated questions are not saved as drafts".to_string()
                } else {
                    format!("cannot save while {}", state_name(&session.state))
                };
                log::debug!("Draft for question {} not saved: {}", self.question_id, reason);
                return Err(AppError::SaveFailed(reason));
            }
            let record = self.snapshot_locked(&session, true)?;
            session.state = AttemptState::Saving;
            (record, session.revision)
        };

        let result = self.api.save_draft(&record).await;

        let mut session = self.session();
        if session.state == AttemptState::Saving {
            session.state = if session.revision == 0 {
                AttemptState::Ready
            } else {
                AttemptState::Solving
            };
        }
        match result {
            Ok(()) => {
                if revision > session.saved_revision {
                    session.saved_revision = revision;
                }
                log::debug!(
                    "Draft saved for question {} at {}s",
                    self.question_id,
                    record.duration
                );
                Ok(())
            }
            Err(e) => {
                let err = match e {
                    AppError::SaveFailed(_) => e,
                    other => AppError::SaveFailed(other.to_string()),
                };
                log::warn!("Draft save for question {} failed: {}", self.question_id, err);
                Err(err)
            }
        }
    }

    /// Page hide / unload: fire-and-forget the current draft. Never waits and
    /// never fails; the page may be gone before a response arrives.
    pub fn save_on_hide(&self) {
        let record = {
            let session = self.session();
            if !self.persisted || !session.state.is_open() {
                return;
            }
            match self.snapshot_locked(&session, true) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("No draft to send for question {}: {}", self.question_id, e);
                    return;
                }
            }
        };
        self.api.send_draft_beacon(record);
    }

    /// Submit the final answer. Only one submit can be in flight; a second
    /// call while one is pending is rejected without touching the network.
    /// A draft save in flight is waited for first. On failure the attempt
    /// stays open so the user can retry.
    pub async fn submit(&self) -> AppResult<SubmitResult> {
        if self.submitting.swap(true, Ordering::AcqRel) {
            log::debug!("Ignoring duplicate submit for question {}", self.question_id);
            return Err(AppError::SubmitInFlight(self.question_id.clone()));
        }
        let _gate = SubmitGate(&self.submitting);
        let _write = self.writes.lock().await;

        let (record, local_result) = {
            let mut session = self.session();
            match &session.state {
                state if state.is_writable() => {}
                AttemptState::Completed(_) => {
                    return Err(AppError::ValidationError(format!(
                        "Question {} is already submitted",
                        self.question_id
                    )))
                }
                other => {
                    return Err(AppError::ValidationError(format!(
                        "Question {} cannot be submitted while {}",
                        self.question_id,
                        state_name(other)
                    )))
                }
            }
            let record = self.snapshot_locked(&session, false)?;
            let local_result = (!self.persisted).then(|| SubmitResult {
                is_correct: session.model.as_ref().is_some_and(|m| m.is_solved()),
                points: 0,
                scoring_details: Some(serde_json::json!({ "scoredLocally": true })),
            });
            session.state = AttemptState::Submitting;
            (record, local_result)
        };

        let result = match local_result {
            Some(result) => Ok(result),
            None => self.api.submit_answer(&record).await,
        };

        let mut session = self.session();
        match result {
            Ok(result) => {
                log::info!(
                    "Question {} submitted after {}s: correct={} points={}",
                    self.question_id,
                    record.duration,
                    result.is_correct,
                    result.points
                );
                session.duration.pause();
                session.saved_revision = session.revision;
                session.last_error = None;
                session.state = AttemptState::Completed(result.clone());
                Ok(result)
            }
            Err(e) => {
                let err = match e {
                    AppError::SubmitFailed(_) => e,
                    other => AppError::SubmitFailed(other.to_string()),
                };
                log::warn!("Submit for question {} failed: {}", self.question_id, err);
                session.state = AttemptState::Solving;
                session.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

#[async_trait]
impl DraftSaver for AttemptController {
    fn has_unsaved_changes(&self) -> bool {
        AttemptController::has_unsaved_changes(self)
    }

    async fn save(&self) -> AppResult<()> {
        self.save_draft().await
    }
}
