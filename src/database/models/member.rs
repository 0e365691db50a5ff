use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role within a team. Stored as the Postgres enum `member_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    User,
    Admin,
}

/// Membership row. Unique per (team_id, user_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub user_id: String,
    pub team_id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}
