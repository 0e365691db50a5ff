// handlers/protected/chats.rs - channel chat history, send, delete and live streams

use axum::extract::{Extension, Json, Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{chat_event_sse, validate_message};
use crate::bus::ChatEventKind;
use crate::chat::ChatScope;
use crate::config;
use crate::database::models::Chat;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ChannelScope};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendChatRequest {
    pub message: String,
}

/// GET /api/teams/:team_id/channels/:channel_id/chats - Last page of the
/// channel's history, oldest first
pub async fn get_for_channel(
    State(state): State<AppState>,
    Extension(scope): Extension<ChannelScope>,
) -> ApiResult<Vec<Chat>> {
    let page_size = config::config().chat.history_page_size;

    // Newest rows win the LIMIT; flip them so the page reads oldest-first.
    let mut chats = sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, message, channel_id, receiver_id, author_id, created_at
        FROM chats
        WHERE channel_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(scope.channel.id)
    .bind(page_size)
    .fetch_all(&state.db)
    .await?;
    chats.reverse();

    Ok(ApiResponse::success(chats))
}

/// POST /api/teams/:team_id/channels/:channel_id/chats - Post a message,
/// then fan it out to live channel subscribers
pub async fn send_to_channel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(scope): Extension<ChannelScope>,
    Json(payload): Json<SendChatRequest>,
) -> ApiResult<Chat> {
    validate_message(&payload.message)?;

    let chat = sqlx::query_as::<_, Chat>(
        r#"
        INSERT INTO chats (id, message, channel_id, author_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, message, channel_id, receiver_id, author_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.message)
    .bind(scope.channel.id)
    .bind(&auth.user_id)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    // Insert and fan-out are two independent steps; a crash in between
    // loses only the live notification, never the row.
    state
        .bus
        .publish(ChatEventKind::MessageAddedToChannel, &chat);

    Ok(ApiResponse::created(chat))
}

/// DELETE /api/teams/:team_id/channels/:channel_id/chats/:chat_id -
/// Author-only delete, fanned out to live subscribers
pub async fn delete_from_channel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(scope): Extension<ChannelScope>,
    Path((_team_id, _channel_id, chat_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<()> {
    let chat = sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, message, channel_id, receiver_id, author_id, created_at
        FROM chats
        WHERE id = $1 AND channel_id = $2
        "#,
    )
    .bind(chat_id)
    .bind(scope.channel.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Chat not found"))?;

    if chat.author_id != auth.user_id {
        return Err(ApiError::unauthorized("Only the author can delete a chat"));
    }

    sqlx::query("DELETE FROM chats WHERE id = $1")
        .bind(chat.id)
        .execute(&state.db)
        .await?;

    state
        .bus
        .publish(ChatEventKind::MessageDeletedFromChannel, &chat);

    Ok(ApiResponse::no_content())
}

/// GET /api/teams/:team_id/channels/:channel_id/chats/live/added -
/// SSE stream of messages posted to this channel
pub async fn live_added(
    State(state): State<AppState>,
    Extension(scope): Extension<ChannelScope>,
) -> impl IntoResponse {
    chat_event_sse(
        &state,
        ChatEventKind::MessageAddedToChannel,
        ChatScope::Channel(scope.channel.id),
        "added",
    )
}

/// GET /api/teams/:team_id/channels/:channel_id/chats/live/deleted -
/// SSE stream of messages removed from this channel
pub async fn live_deleted(
    State(state): State<AppState>,
    Extension(scope): Extension<ChannelScope>,
) -> impl IntoResponse {
    chat_event_sse(
        &state,
        ChatEventKind::MessageDeletedFromChannel,
        ChatScope::Channel(scope.channel.id),
        "deleted",
    )
}
