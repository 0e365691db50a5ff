// handlers/protected/channels.rs - /api/teams/:team_id/channels handlers

use axum::extract::{Extension, Json, State};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::validate_name;
use crate::config;
use crate::database::models::Channel;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ChannelScope, TeamScope};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChannelRequest {
    pub name: String,
}

/// POST /api/teams/:team_id/channels - Create a channel (admin)
pub async fn create(
    State(state): State<AppState>,
    Extension(scope): Extension<TeamScope>,
    Json(payload): Json<CreateChannelRequest>,
) -> ApiResult<Channel> {
    validate_name(&payload.name)?;

    let limits = &config::config().limits;
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM channels WHERE team_id = $1")
        .bind(scope.team.id)
        .fetch_one(&state.db)
        .await?;

    if existing >= limits.max_channels_per_team {
        return Err(ApiError::precondition_failed(format!(
            "A team can only create {} channels",
            limits.max_channels_per_team
        )));
    }

    let channel = sqlx::query_as::<_, Channel>(
        r#"
        INSERT INTO channels (id, name, team_id, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, team_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.name)
    .bind(scope.team.id)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    Ok(ApiResponse::created(channel))
}

/// GET /api/teams/:team_id/channels - All channels of the team
pub async fn get_all(
    State(state): State<AppState>,
    Extension(scope): Extension<TeamScope>,
) -> ApiResult<Vec<Channel>> {
    let channels = sqlx::query_as::<_, Channel>(
        "SELECT id, name, team_id, created_at FROM channels WHERE team_id = $1",
    )
    .bind(scope.team.id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::success(channels))
}

/// GET /api/teams/:team_id/channels/:channel_id - One channel
///
/// The channel middleware already resolved the row; just hand it back.
pub async fn get_by_id(Extension(scope): Extension<ChannelScope>) -> ApiResult<Channel> {
    Ok(ApiResponse::success(scope.channel))
}

/// PUT /api/teams/:team_id/channels/:channel_id - Rename a channel (admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(scope): Extension<ChannelScope>,
    Json(payload): Json<UpdateChannelRequest>,
) -> ApiResult<Channel> {
    validate_name(&payload.name)?;

    let channel = sqlx::query_as::<_, Channel>(
        "UPDATE channels SET name = $1 WHERE id = $2 RETURNING id, name, team_id, created_at",
    )
    .bind(&payload.name)
    .bind(scope.channel.id)
    .fetch_one(&state.db)
    .await?;

    Ok(ApiResponse::success(channel))
}

/// DELETE /api/teams/:team_id/channels/:channel_id - Delete a channel (admin)
///
/// Chats reference the channel, so they go first.
pub async fn delete(
    State(state): State<AppState>,
    Extension(scope): Extension<ChannelScope>,
) -> ApiResult<()> {
    sqlx::query("DELETE FROM chats WHERE channel_id = $1")
        .bind(scope.channel.id)
        .execute(&state.db)
        .await?;

    sqlx::query("DELETE FROM channels WHERE id = $1")
        .bind(scope.channel.id)
        .execute(&state.db)
        .await?;

    tracing::info!("Channel '{}' deleted", scope.channel.id);
    Ok(ApiResponse::no_content())
}
