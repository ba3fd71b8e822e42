use std::sync::Arc;

use crate::{
    api::{HttpQuestionApi, QuestionApi},
    auth::SessionStore,
    config::Config,
    errors::{AppError, AppResult},
    services::{AttemptController, HandoffStore, SessionService},
};

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn QuestionApi>,
    pub sessions: Arc<SessionService>,
    pub handoffs: Arc<HandoffStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        config.validate()?;

        let api: Arc<dyn QuestionApi> = Arc::new(HttpQuestionApi::new(&config)?);
        let store = SessionStore::open(config.session_file.clone()).await?;
        let sessions = Arc::new(SessionService::new(api.clone(), store));

        Ok(Self {
            api,
            sessions,
            handoffs: Arc::new(HandoffStore::new()),
            config: Arc::new(config),
        })
    }

    /// Load a server question and resume its latest draft.
    pub async fn start_attempt(&self, question_id: &str) -> AppResult<Arc<AttemptController>> {
        let controller = Arc::new(AttemptController::new(
            self.api.clone(),
            question_id,
            self.config.history_limit,
        ));
        controller.load().await?;
        Ok(controller)
    }

    /// Start solving a question previously handed off under `key`.
    pub fn start_generated(&self, key: &str) -> AppResult<Arc<AttemptController>> {
        let generated = self
            .handoffs
            .take(key)
            .ok_or_else(|| AppError::NotFound(format!("No generated question under '{}'", key)))?;
        let controller =
            AttemptController::from_generated(self.api.clone(), generated, self.config.history_limit)?;
        Ok(Arc::new(controller))
    }
}
