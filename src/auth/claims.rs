use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{AppError, AppResult},
    models::domain::UserRole,
};

/// Claims carried by the server-issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String, // user id
    #[serde(default)]
    pub role: Option<UserRole>,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

impl TokenClaims {
    /// Read the claims without checking the signature. The client has no
    /// key; the server verifies every request it receives.
    pub fn peek(token: &str) -> AppResult<Self> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Unreadable token: {}", e)))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp as i64, 0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        (self.exp as i64) <= now.timestamp()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
