pub mod http;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::{
    errors::AppResult,
    models::{
        domain::{AttemptRecord, Question, QuestionTypeInfo, SubmitResult, User},
        dto::{
            request::{LoginRequest, RegisterRequest},
            response::LoginResponse,
        },
    },
};

pub use http::HttpQuestionApi;

/// The backend REST surface the attempt lifecycle consumes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionApi: Send + Sync {
    /// Replace the bearer token used for every following request.
    fn set_token(&self, token: Option<SecretString>);
    async fn fetch_question(&self, question_id: &str) -> AppResult<Question>;
    /// `None` when the user has no draft for this question.
    async fn fetch_latest_draft(&self, question_id: &str) -> AppResult<Option<AttemptRecord>>;
    async fn save_draft(&self, record: &AttemptRecord) -> AppResult<()>;
    async fn submit_answer(&self, record: &AttemptRecord) -> AppResult<SubmitResult>;
    /// Best-effort send that must not block the caller; failures are only logged.
    fn send_draft_beacon(&self, record: AttemptRecord);
    async fn list_question_types(&self) -> AppResult<Vec<QuestionTypeInfo>>;
    async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse>;
    async fn register(&self, request: &RegisterRequest) -> AppResult<User>;
    async fn logout(&self, token: &SecretString) -> AppResult<()>;
}
