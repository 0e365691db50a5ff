// handlers/protected/direct.rs - direct (one-to-one) chat handlers

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
use crate::identity::IdentityError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendDirectChatRequest {
    pub message: String,
}

/// GET /api/direct/:user_id/chats - Last page of the conversation with
/// that user, oldest first. Both directions of the pair count.
pub async fn get_with_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Chat>> {
    let page_size = config::config().chat.history_page_size;

    let mut chats = sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, message, channel_id, receiver_id, author_id, created_at
        FROM chats
        WHERE (author_id = $1 AND receiver_id = $2)
           OR (author_id = $2 AND receiver_id = $1)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(&auth.user_id)
    .bind(&user_id)
    .bind(page_size)
    .fetch_all(&state.db)
    .await?;
    chats.reverse();

    Ok(ApiResponse::success(chats))
}

/// POST /api/direct/:user_id/chats - Send a direct message, then fan it
/// out to the pair's live subscribers
pub async fn send_to_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(payload): Json<SendDirectChatRequest>,
) -> ApiResult<Chat> {
    validate_message(&payload.message)?;

    // The receiver id comes straight from the client; make sure it names
    // a real user before a row referencing it exists.
    state
        .identity
        .verify_user(&user_id)
        .await
        .map_err(|err| match err {
            IdentityError::Rejected => ApiError::not_found("Recipient user not found"),
            IdentityError::Transport(msg) => {
                tracing::error!("Identity provider unreachable during direct send: {}", msg);
                ApiError::internal_server_error("Failed to verify the recipient")
            }
        })?;

    let chat = sqlx::query_as::<_, Chat>(
        r#"
        INSERT INTO chats (id, message, receiver_id, author_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, message, channel_id, receiver_id, author_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.message)
    .bind(&user_id)
    .bind(&auth.user_id)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    state.bus.publish(ChatEventKind::MessageAddedDirect, &chat);

    Ok(ApiResponse::created(chat))
}

/// DELETE /api/direct/:user_id/chats/:chat_id - Author-only delete
pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((user_id, chat_id)): Path<(String, Uuid)>,
) -> ApiResult<()> {
    let chat = sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, message, channel_id, receiver_id, author_id, created_at
        FROM chats
        WHERE id = $1 AND receiver_id IS NOT NULL
        "#,
    )
    .bind(chat_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Chat not found"))?;

    // The chat must belong to this conversation pair
    let scope = ChatScope::Direct {
        user_id: auth.user_id.clone(),
        remote_participant: user_id,
    };
    if !scope.matches(&chat) {
        return Err(ApiError::not_found("Chat not found"));
    }

    if chat.author_id != auth.user_id {
        return Err(ApiError::unauthorized("Only the author can delete a chat"));
    }

    sqlx::query("DELETE FROM chats WHERE id = $1")
        .bind(chat.id)
        .execute(&state.db)
        .await?;

    state.bus.publish(ChatEventKind::MessageDeletedDirect, &chat);

    Ok(ApiResponse::no_content())
}

/// GET /api/direct/:user_id/chats/live/added - SSE stream of direct
/// messages between the caller and that user
pub async fn live_added(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    chat_event_sse(
        &state,
        ChatEventKind::MessageAddedDirect,
        ChatScope::Direct {
            user_id: auth.user_id,
            remote_participant: user_id,
        },
        "added",
    )
}

/// GET /api/direct/:user_id/chats/live/deleted - SSE stream of deletions
/// in the conversation
pub async fn live_deleted(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    chat_event_sse(
        &state,
        ChatEventKind::MessageDeletedDirect,
        ChatScope::Direct {
            user_id: auth.user_id,
            remote_participant: user_id,
        },
        "deleted",
    )
}
