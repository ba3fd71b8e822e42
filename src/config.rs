use std::{env, path::PathBuf, time::Duration};

use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<SecretString>,
    pub request_timeout_secs: u64,
    pub autosave_interval_secs: u64,
    pub history_limit: usize,
    pub session_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api".to_string()),
            api_token: env::var("API_TOKEN").ok().map(SecretString::from),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            autosave_interval_secs: env::var("AUTOSAVE_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            history_limit: env::var("HISTORY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".problemset-session.json")),
        }
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        let url = reqwest::Url::parse(&self.api_base_url).map_err(|e| {
            AppError::ValidationError(format!(
                "API_BASE_URL '{}' is not a valid URL: {}",
                self.api_base_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AppError::ValidationError(format!(
                "API_BASE_URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::ValidationError(
                "REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.autosave_interval_secs == 0 {
            return Err(AppError::ValidationError(
                "AUTOSAVE_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.history_limit == 0 {
            return Err(AppError::ValidationError(
                "HISTORY_LIMIT must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api".to_string(),
            api_token: None,
            request_timeout_secs: 1,
            autosave_interval_secs: 5,
            history_limit: 10,
            session_file: PathBuf::from("test-session.json"),
        }
    }
}
