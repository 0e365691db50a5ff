use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::Response,
};
use sqlx::Row;

use super::auth::AuthUser;
use super::path_uuid;
use crate::database::models::{Member, MemberRole, Team};
use crate::error::ApiError;
use crate::state::AppState;

/// Team-scoped authorization context: the requested team plus the caller's
/// membership row, injected by the layer-2 middleware.
#[derive(Clone, Debug)]
pub struct TeamScope {
    pub team: Team,
    pub member: Member,
}

/// Layer 2: the caller must be a member of the `:team_id` team.
pub async fn require_team_member(
    State(state): State<AppState>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    scope_to_team(state, params, request, next, false).await
}

/// Layer 2 with the admin flag set: membership alone is not enough.
pub async fn require_team_admin(
    State(state): State<AppState>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    scope_to_team(state, params, request, next, true).await
}

async fn scope_to_team(
    state: AppState,
    params: RawPathParams,
    mut request: Request,
    next: Next,
    require_admin: bool,
) -> Result<Response, ApiError> {
    let team_id = path_uuid(&params, "team_id")?;

    // Layer 1 must have run first
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| {
            ApiError::internal_server_error("Capability key check required before team validation")
        })?
        .clone();

    let row = sqlx::query(
        r#"
        SELECT
            t.id AS team_id, t.name AS team_name, t.owner_id AS team_owner_id,
            t.created_at AS team_created_at,
            m.id AS member_id, m.user_id AS member_user_id, m.role AS member_role,
            m.created_at AS member_created_at
        FROM members m
        INNER JOIN teams t ON t.id = m.team_id
        WHERE m.team_id = $1 AND m.user_id = $2
        "#,
    )
    .bind(team_id)
    .bind(&auth_user.user_id)
    .fetch_optional(&state.db)
    .await?;

    let row = row.ok_or_else(|| {
        tracing::debug!("No membership for user in team {}", team_id);
        ApiError::not_found("Team not found")
    })?;

    let role: MemberRole = row.get("member_role");
    if require_admin && role != MemberRole::Admin {
        tracing::warn!(
            "User '{}' attempted an admin operation on team {} with role {:?}",
            auth_user.user_id,
            team_id,
            role
        );
        return Err(ApiError::unauthorized("Team admin role required"));
    }

    let scope = TeamScope {
        team: Team {
            id: row.get("team_id"),
            name: row.get("team_name"),
            owner_id: row.get("team_owner_id"),
            created_at: row.get("team_created_at"),
        },
        member: Member {
            id: row.get("member_id"),
            user_id: row.get("member_user_id"),
            team_id: row.get("team_id"),
            role,
            created_at: row.get("member_created_at"),
        },
    };

    request.extensions_mut().insert(scope);
    Ok(next.run(request).await)
}
