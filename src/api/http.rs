use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use super::QuestionApi;
use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::{
        domain::{AttemptRecord, Question, QuestionTypeInfo, SubmitResult, User},
        dto::{
            request::{AttemptRequest, LoginRequest, RegisterRequest},
            response::{ApiResponse, DraftResponse, LoginResponse},
        },
    },
};

const REQUEST_ID_HEADER: &str = "X-Request-Id";
const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// `reqwest` implementation of [`QuestionApi`].
pub struct HttpQuestionApi {
    client: Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
}

impl HttpQuestionApi {
    pub fn new(config: &Config) -> AppResult<Self> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| AppError::ValidationError(format!("Invalid API base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::ValidationError(format!(
                "API base URL '{}' cannot carry a path",
                base_url
            )));
        }
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token: RwLock::new(config.api_token.clone()),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(segments))
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        let token = match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    fn attempt_request(&self, segments: &[&str], record: &AttemptRecord) -> AppResult<RequestBuilder> {
        let body = AttemptRequest::from(record);
        body.validate()?;
        Ok(self
            .request(Method::POST, segments)
            .header(IDEMPOTENCY_KEY_HEADER, record.idempotency_key())
            .json(&body))
    }

    /// Send and decode the envelope. Transport and server failures are wrapped
    /// with `failure`; 401 and 404 keep their own variants.
    async fn send<T: DeserializeOwned>(
        request: RequestBuilder,
        failure: fn(String) -> AppError,
    ) -> AppResult<ApiResponse<T>> {
        let response = request.send().await.map_err(|e| failure(e.to_string()))?;
        let response = Self::check_status(response, failure).await?;
        response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| AppError::MalformedContent(format!("Unreadable response body: {}", e)))
    }

    async fn check_status(response: Response, failure: fn(String) -> AppError) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ApiResponse<serde_json::Value>>()
            .await
            .map(|body| body.message)
            .unwrap_or_default();
        let detail = if message.is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, message)
        };
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(detail),
            StatusCode::NOT_FOUND => AppError::NotFound(detail),
            _ => failure(detail),
        })
    }
}

#[async_trait]
impl QuestionApi for HttpQuestionApi {
    fn set_token(&self, token: Option<SecretString>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    async fn fetch_question(&self, question_id: &str) -> AppResult<Question> {
        let request = self.request(Method::GET, &["questions", question_id]);
        Self::send::<Question>(request, AppError::ContentFetchFailed)
            .await?
            .into_data()
    }

    async fn fetch_latest_draft(&self, question_id: &str) -> AppResult<Option<AttemptRecord>> {
        let request = self.request(Method::GET, &["questions", question_id, "drafts", "latest"]);
        match Self::send::<DraftResponse>(request, AppError::ContentFetchFailed).await {
            Ok(envelope) => Ok(envelope.data.map(AttemptRecord::from)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save_draft(&self, record: &AttemptRecord) -> AppResult<()> {
        let request = self.attempt_request(&["questions", record.question_id.as_str(), "drafts"], record)?;
        Self::send::<serde_json::Value>(request, AppError::SaveFailed).await?;
        log::debug!(
            "Saved draft for question {} at {}s",
            record.question_id,
            record.duration
        );
        Ok(())
    }

    async fn submit_answer(&self, record: &AttemptRecord) -> AppResult<SubmitResult> {
        let request = self.attempt_request(&["questions", record.question_id.as_str(), "submit"], record)?;
        Self::send::<SubmitResult>(request, AppError::SubmitFailed)
            .await?
            .into_data()
    }

    fn send_draft_beacon(&self, record: AttemptRecord) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!(
                "No async runtime available, dropping draft beacon for question {}",
                record.question_id
            );
            return;
        };
        let request = match self.attempt_request(&["questions", record.question_id.as_str(), "drafts"], &record) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Dropping invalid draft beacon: {}", e);
                return;
            }
        };
        runtime.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    log::debug!("Draft beacon delivered for question {}", record.question_id);
                }
                Ok(response) => log::warn!(
                    "Draft beacon for question {} answered {}",
                    record.question_id,
                    response.status()
                ),
                Err(e) => log::warn!(
                    "Draft beacon for question {} failed: {}",
                    record.question_id,
                    e
                ),
            }
        });
    }

    async fn list_question_types(&self) -> AppResult<Vec<QuestionTypeInfo>> {
        let request = self.request(Method::GET, &["question-types"]);
        Self::send::<Vec<QuestionTypeInfo>>(request, AppError::ContentFetchFailed)
            .await?
            .into_data()
    }

    async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        let builder = self.request(Method::POST, &["auth", "login"]).json(request);
        Self::send::<LoginResponse>(builder, AppError::ContentFetchFailed)
            .await?
            .into_data()
    }

    async fn register(&self, request: &RegisterRequest) -> AppResult<User> {
        let builder = self.request(Method::POST, &["auth", "register"]).json(request);
        Self::send::<User>(builder, AppError::ContentFetchFailed)
            .await?
            .into_data()
    }

    async fn logout(&self, token: &SecretString) -> AppResult<()> {
        let builder = self
            .client
            .post(self.url(&["auth", "logout"]))
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string())
            .bearer_auth(token.expose_secret());
        Self::send::<serde_json::Value>(builder, AppError::InternalError).await?;
        self.set_token(None);
        Ok(())
    }
}
