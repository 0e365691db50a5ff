use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A chat message. Exactly one of `channel_id` (group chat) and
/// `receiver_id` (direct chat) is set; the insert helpers in the chat
/// handlers maintain the invariant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chat {
    pub id: Uuid,
    pub message: String,
    pub channel_id: Option<Uuid>,
    pub receiver_id: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn is_direct(&self) -> bool {
        self.receiver_id.is_some()
    }
}
