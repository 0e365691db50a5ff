use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};

use crate::bus::ChatEventKind;
use crate::chat::{ChatScope, ChatSession};
use crate::error::ApiError;
use crate::state::AppState;

pub mod channels;
pub mod chats;
pub mod direct;
pub mod teams;

/// Team and channel names: 4-256 characters, matching the client forms.
pub(crate) fn validate_name(name: &str) -> Result<(), ApiError> {
    let len = name.chars().count();
    if !(4..=256).contains(&len) {
        return Err(ApiError::bad_request(
            "Name must be between 4 and 256 characters",
        ));
    }
    Ok(())
}

pub(crate) fn validate_message(message: &str) -> Result<(), ApiError> {
    let max = crate::config::config().chat.max_message_length;
    let len = message.chars().count();
    if len == 0 || len > max {
        return Err(ApiError::bad_request(format!(
            "Message must be between 1 and {} characters",
            max
        )));
    }
    Ok(())
}

/// Open a scope-filtered live subscription and expose it as an SSE
/// response. The bus registration lives inside the response stream, so
/// client disconnect on any path drops the stream and deregisters it.
pub(crate) fn chat_event_sse(
    state: &AppState,
    kind: ChatEventKind,
    scope: ChatScope,
    event_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let session = ChatSession::open(&state.bus, kind, scope);
    let stream = session.map(move |chat| Event::default().event(event_name).json_data(&chat));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
