use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{IdentityError, IdentityOracle, VerifiedSession};
use crate::config;

/// HTTP client for a Clerk-style identity provider backend API.
pub struct ClerkOracle {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl ClerkOracle {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn from_config() -> Self {
        let identity = &config::config().identity;
        Self::new(identity.base_url.clone(), identity.secret_key.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    user_id: String,
}

#[async_trait]
impl IdentityOracle for ClerkOracle {
    async fn verify_session(
        &self,
        session_id: &str,
        token: &str,
    ) -> Result<VerifiedSession, IdentityError> {
        let response = self
            .http
            .post(self.url(&format!("/v1/sessions/{}/verify", session_id)))
            .bearer_auth(&self.secret_key)
            .json(&json!({ "token": token }))
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let session: SessionResponse = response
                .json()
                .await
                .map_err(|e| IdentityError::Transport(e.to_string()))?;
            Ok(VerifiedSession {
                user_id: session.user_id,
            })
        } else if status.is_client_error() {
            Err(IdentityError::Rejected)
        } else {
            Err(IdentityError::Transport(format!(
                "session verify returned {}",
                status
            )))
        }
    }

    async fn verify_user(&self, user_id: &str) -> Result<(), IdentityError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/users/{}", user_id)))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(IdentityError::Rejected)
        } else {
            Err(IdentityError::Transport(format!(
                "user lookup returned {}",
                status
            )))
        }
    }
}
