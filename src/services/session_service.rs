use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::Mutex;
use validator::Validate;

use crate::{
    api::QuestionApi,
    auth::{SessionStore, TokenClaims},
    errors::{AppError, AppResult},
    models::{
        domain::User,
        dto::request::{LoginRequest, RegisterRequest},
    },
};

/// Login, registration and logout on top of the API client and the persisted
/// session.
pub struct SessionService {
    api: Arc<dyn QuestionApi>,
    store: Mutex<SessionStore>,
}

impl SessionService {
    /// Wraps an already opened store, forwarding any restored token to the API.
    pub fn new(api: Arc<dyn QuestionApi>, store: SessionStore) -> Self {
        if let Some(session) = store.current() {
            log::info!("Restored session for {}", session.user.username);
            api.set_token(Some(session.token.clone()));
        }
        Self {
            api,
            store: Mutex::new(store),
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.store.lock().await.current().map(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.store.lock().await.current().is_some()
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<User> {
        request.validate()?;

        let response = self.api.login(&request).await?;
        let claims = TokenClaims::peek(&response.token)?;
        if claims.is_expired() {
            return Err(AppError::Unauthorized(
                "Server issued an expired token".to_string(),
            ));
        }

        let token = SecretString::from(response.token);
        self.store
            .lock()
            .await
            .save_session(response.user.clone(), token.clone())
            .await?;
        self.api.set_token(Some(token));

        log::info!("Logged in as {}", response.user.username);
        Ok(response.user)
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        request.validate()?;

        let user = self.api.register(&request).await?;
        log::info!("Registered user {}", user.username);
        Ok(user)
    }

    /// Always ends signed out locally, even when the server call fails.
    pub async fn logout(&self) -> AppResult<()> {
        let mut store = self.store.lock().await;
        if let Some(session) = store.current() {
            if let Err(e) = self.api.logout(&session.token).await {
                log::warn!("Server logout failed, clearing local session anyway: {}", e);
            }
        }
        self.api.set_token(None);
        store.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::MockQuestionApi,
        auth::claims::test_tokens::token_expiring_in,
        models::{domain::UserRole, dto::response::LoginResponse},
    };
    use secrecy::ExposeSecret;

    fn ada() -> User {
        User::new("u-1", "ada", "ada@example.com", UserRole::Student)
    }

    async fn empty_store(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::open(dir.path().join("session.json"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn login_persists_session_and_sets_token() {
        let dir = tempfile::tempdir().unwrap();
        let token = token_expiring_in(1);
        let mut api = MockQuestionApi::new();
        let issued = token.clone();
        api.expect_login().times(1).returning(move |_| {
            Ok(LoginResponse {
                token: issued.clone(),
                user: ada(),
            })
        });
        api.expect_set_token()
            .withf(|token| token.is_some())
            .times(1)
            .return_const(());
        let service = SessionService::new(Arc::new(api), empty_store(&dir).await);

        let user = service
            .login(LoginRequest {
                username: "ada".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.username, "ada");
        assert!(service.is_authenticated().await);
        let reopened = SessionStore::open(dir.path().join("session.json"))
            .await
            .unwrap();
        assert_eq!(reopened.current().unwrap().token.expose_secret(), token);
    }

    #[tokio::test]
    async fn invalid_login_never_reaches_api() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockQuestionApi::new();
        api.expect_login().never();
        let service = SessionService::new(Arc::new(api), empty_store(&dir).await);

        let result = service
            .login(LoginRequest {
                username: "a".to_string(),
                password: "secret".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn logout_clears_session_even_if_server_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        store
            .save_session(ada(), SecretString::from(token_expiring_in(1)))
            .await
            .unwrap();
        let mut api = MockQuestionApi::new();
        api.expect_set_token().return_const(());
        api.expect_logout()
            .times(1)
            .returning(|_| Err(AppError::InternalError("down".to_string())));
        let service = SessionService::new(Arc::new(api), store);

        service.logout().await.unwrap();

        assert!(service.current_user().await.is_none());
        assert!(!dir.path().join("session.json").exists());
    }
}
