use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{auth::claims::TokenClaims, errors::AppResult, models::domain::User};

/// The signed-in user and their bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    user: User,
    token: String,
}

/// File-backed store for the auth session. Read once when opened, written on
/// login and removed on logout.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: Option<AuthSession>,
    hydrated: bool,
}

impl SessionStore {
    /// Load whatever session the file holds. A missing, unreadable or expired
    /// session leaves the store empty; none of those are errors.
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let current = match tokio::fs::read(&path).await {
            Ok(bytes) => Self::restore(&path, &bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            current,
            hydrated: true,
        })
    }

    fn restore(path: &Path, bytes: &[u8]) -> Option<AuthSession> {
        let stored: StoredSession = match serde_json::from_slice(bytes) {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("Discarding unreadable session file {}: {}", path.display(), e);
                return None;
            }
        };
        let claims = match TokenClaims::peek(&stored.token) {
            Ok(claims) => claims,
            Err(e) => {
                log::warn!("Discarding stored session with bad token: {}", e);
                return None;
            }
        };
        if claims.is_expired() {
            log::info!("Stored session for {} has expired", stored.user.username);
            return None;
        }

        Some(AuthSession {
            user: stored.user,
            token: SecretString::from(stored.token),
            expires_at: claims.expires_at(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Option<&AuthSession> {
        self.current.as_ref()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub async fn save_session(&mut self, user: User, token: SecretString) -> AppResult<()> {
        let claims = TokenClaims::peek(token.expose_secret())?;
        let stored = StoredSession {
            user: user.clone(),
            token: token.expose_secret().to_string(),
        };
        let bytes = serde_json::to_vec_pretty(&stored)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        log::info!("Stored session for {}", user.username);
        self.current = Some(AuthSession {
            user,
            token,
            expires_at: claims.expires_at(),
        });
        Ok(())
    }

    pub async fn clear(&mut self) -> AppResult<()> {
        self.current = None;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::claims::test_tokens::token_expiring_in, models::domain::UserRole};

    fn user() -> User {
        User::new("u-1", "ada", "ada@example.com", UserRole::Student)
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();

        let store = SessionStore::open(dir.path().join("session.json")).await.unwrap();

        assert!(store.is_hydrated());
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn saved_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let token = token_expiring_in(1);

        let mut store = SessionStore::open(&path).await.unwrap();
        store
            .save_session(user(), SecretString::from(token.clone()))
            .await
            .unwrap();
        let reopened = SessionStore::open(&path).await.unwrap();

        let session = reopened.current().unwrap();
        assert_eq!(session.user.username, "ada");
        assert_eq!(session.token.expose_secret(), token);
        assert!(session.expires_at.is_some());
    }

    #[tokio::test]
    async fn expired_session_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let stored = serde_json::json!({ "user": user(), "token": token_expiring_in(-1) });
        std::fs::write(&path, stored.to_string()).unwrap();

        let store = SessionStore::open(&path).await.unwrap();

        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn malformed_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SessionStore::open(&path).await.unwrap();

        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut store = SessionStore::open(&path).await.unwrap();
        store
            .save_session(user(), SecretString::from(token_expiring_in(1)))
            .await
            .unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.current().is_none());
        assert!(!path.exists());
    }
}
