use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::Response,
};

use super::path_uuid;
use super::team::TeamScope;
use crate::database::models::Channel;
use crate::error::ApiError;
use crate::state::AppState;

/// Channel-scoped authorization context, injected by the layer-3 middleware.
#[derive(Clone, Debug)]
pub struct ChannelScope {
    pub channel: Channel,
}

/// Layer 3: the `:channel_id` channel must exist under the team that
/// layer 2 already scoped the request to.
pub async fn require_channel(
    State(state): State<AppState>,
    params: RawPathParams,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let channel_id = path_uuid(&params, "channel_id")?;

    let team_id = request
        .extensions()
        .get::<TeamScope>()
        .ok_or_else(|| {
            ApiError::internal_server_error("Team validation required before channel validation")
        })?
        .team
        .id;

    let channel = sqlx::query_as::<_, Channel>(
        "SELECT id, name, team_id, created_at FROM channels WHERE id = $1 AND team_id = $2",
    )
    .bind(channel_id)
    .bind(team_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        tracing::debug!("Channel {} not found under team {}", channel_id, team_id);
        ApiError::not_found("Channel not found")
    })?;

    request.extensions_mut().insert(ChannelScope { channel });
    Ok(next.run(request).await)
}
