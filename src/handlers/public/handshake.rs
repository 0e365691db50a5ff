// handlers/public/handshake.rs - POST /handshake handler

use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};

use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    pub session_id: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct HandshakeResponse {
    pub key: String,
}

/// POST /handshake - Exchange an identity-provider session proof for a
/// short-lived capability key
///
/// The sole path by which a capability key is minted. Safe to call
/// repeatedly: each call yields a fresh key and invalidates any key the
/// user already held, so clients re-run it near TTL expiry to keep their
/// session alive.
pub async fn handshake_post(
    State(state): State<AppState>,
    Json(payload): Json<HandshakeRequest>,
) -> ApiResult<HandshakeResponse> {
    // Any oracle failure surfaces as Unauthenticated (see From<IdentityError>)
    let session = state
        .identity
        .verify_session(&payload.session_id, &payload.token)
        .await?;

    let key = state.tokens.issue(&session.user_id);
    tracing::debug!("Issued capability key for user '{}'", session.user_id);

    Ok(ApiResponse::success(HandshakeResponse { key }))
}
