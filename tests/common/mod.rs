use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use serde_json::{json, Value};

use huddle_api::bus::ChatBus;
use huddle_api::identity::{IdentityError, IdentityOracle, VerifiedSession};
use huddle_api::state::AppState;
use huddle_api::tokens::TokenCache;

/// Identity oracle that accepts or rejects every credential, so the
/// handshake path can be driven without a live provider.
pub struct StaticOracle {
    pub user_id: Option<&'static str>,
}

impl StaticOracle {
    pub fn accepting(user_id: &'static str) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn rejecting() -> Self {
        Self { user_id: None }
    }
}

#[async_trait]
impl IdentityOracle for StaticOracle {
    async fn verify_session(
        &self,
        _session_id: &str,
        _token: &str,
    ) -> Result<VerifiedSession, IdentityError> {
        match self.user_id {
            Some(user_id) => Ok(VerifiedSession {
                user_id: user_id.to_string(),
            }),
            None => Err(IdentityError::Rejected),
        }
    }

    async fn verify_user(&self, _user_id: &str) -> Result<(), IdentityError> {
        match self.user_id {
            Some(_) => Ok(()),
            None => Err(IdentityError::Rejected),
        }
    }
}

/// State with a fresh token cache and bus, a mock oracle, and a pool that
/// never connects (these tests touch no persistence).
pub fn test_state(oracle: StaticOracle) -> AppState {
    let db = huddle_api::database::connect_pool_lazy().expect("lazy pool");
    AppState::new(
        db,
        Arc::new(TokenCache::new(Duration::from_secs(3600))),
        Arc::new(ChatBus::new()),
        Arc::new(oracle),
    )
}

pub fn handshake_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/handshake")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "sessionId": "sess_1", "token": "proof" }).to_string(),
        ))
        .expect("request")
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
