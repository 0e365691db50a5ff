// handlers/protected/teams.rs - /api/teams handlers

use axum::extract::{Extension, Json, Path, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use super::validate_name;
use crate::config;
use crate::database::models::{Member, MemberRole, Team};
use crate::error::ApiError;
use crate::identity::IdentityError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TeamScope};
use crate::state::AppState;

/// A team joined with one membership row (the caller's).
#[derive(Debug, Serialize)]
pub struct TeamMembership {
    pub team: Team,
    pub member: Member,
}

#[derive(Debug, Serialize)]
pub struct TeamDetail {
    pub team: Team,
    pub members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMemberRequest {
    pub user_id: String,
    pub role: Option<MemberRole>,
}

#[derive(Debug, Deserialize)]
pub struct AddMembersRequest {
    pub members: Vec<NewMemberRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMembersRequest {
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: MemberRole,
}

/// POST /api/teams - Create a team; the creator becomes its admin member
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateTeamRequest>,
) -> ApiResult<TeamMembership> {
    validate_name(&payload.name)?;

    let limits = &config::config().limits;
    let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE owner_id = $1")
        .bind(&auth.user_id)
        .fetch_one(&state.db)
        .await?;

    if owned >= limits.max_teams_owned_per_user {
        return Err(ApiError::precondition_failed(format!(
            "A user can only create {} teams",
            limits.max_teams_owned_per_user
        )));
    }

    let team = sqlx::query_as::<_, Team>(
        r#"
        INSERT INTO teams (id, name, owner_id, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, owner_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.name)
    .bind(&auth.user_id)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    let member = sqlx::query_as::<_, Member>(
        r#"
        INSERT INTO members (id, user_id, team_id, role, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, team_id, role, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&auth.user_id)
    .bind(team.id)
    .bind(MemberRole::Admin)
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Team '{}' created by user '{}'", team.id, auth.user_id);
    Ok(ApiResponse::created(TeamMembership { team, member }))
}

/// GET /api/teams - All teams the caller is a member of
pub async fn get_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<TeamMembership>> {
    let rows = sqlx::query(
        r#"
        SELECT
            t.id AS team_id, t.name AS team_name, t.owner_id AS team_owner_id,
            t.created_at AS team_created_at,
            m.id AS member_id, m.user_id AS member_user_id, m.role AS member_role,
            m.created_at AS member_created_at
        FROM members m
        INNER JOIN teams t ON t.id = m.team_id
        WHERE m.user_id = $1
        "#,
    )
    .bind(&auth.user_id)
    .fetch_all(&state.db)
    .await?;

    let memberships = rows
        .into_iter()
        .map(|row| TeamMembership {
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
                role: row.get("member_role"),
                created_at: row.get("member_created_at"),
            },
        })
        .collect();

    Ok(ApiResponse::success(memberships))
}

/// GET /api/teams/:team_id - Team details with its member list
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(scope): Extension<TeamScope>,
) -> ApiResult<TeamDetail> {
    let members = sqlx::query_as::<_, Member>(
        "SELECT id, user_id, team_id, role, created_at FROM members WHERE team_id = $1",
    )
    .bind(scope.team.id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::success(TeamDetail {
        team: scope.team,
        members,
    }))
}

/// PUT /api/teams/:team_id - Rename a team (admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(scope): Extension<TeamScope>,
    Json(payload): Json<UpdateTeamRequest>,
) -> ApiResult<Team> {
    validate_name(&payload.name)?;

    let team = sqlx::query_as::<_, Team>(
        "UPDATE teams SET name = $1 WHERE id = $2 RETURNING id, name, owner_id, created_at",
    )
    .bind(&payload.name)
    .bind(scope.team.id)
    .fetch_one(&state.db)
    .await?;

    Ok(ApiResponse::success(team))
}

/// PUT /api/teams/:team_id/members/:member_id/role - Change a member's role (admin)
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(scope): Extension<TeamScope>,
    Path((_team_id, member_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Member> {
    let member = sqlx::query_as::<_, Member>(
        r#"
        UPDATE members SET role = $1
        WHERE team_id = $2 AND id = $3
        RETURNING id, user_id, team_id, role, created_at
        "#,
    )
    .bind(payload.role)
    .bind(scope.team.id)
    .bind(member_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Member not found"))?;

    Ok(ApiResponse::success(member))
}

/// POST /api/teams/:team_id/members - Add members by identity-provider user id (admin)
pub async fn add_members(
    State(state): State<AppState>,
    Extension(scope): Extension<TeamScope>,
    Json(payload): Json<AddMembersRequest>,
) -> ApiResult<()> {
    if payload.members.is_empty() {
        return Err(ApiError::bad_request("No members given"));
    }

    // Requested user ids must exist with the identity provider
    for requested in &payload.members {
        state
            .identity
            .verify_user(&requested.user_id)
            .await
            .map_err(|err| match err {
                IdentityError::Rejected => ApiError::bad_request("Some user ids don't exist"),
                IdentityError::Transport(msg) => {
                    tracing::error!("Identity provider unreachable during member add: {}", msg);
                    ApiError::internal_server_error("Failed to verify user ids")
                }
            })?;
    }

    let limits = &config::config().limits;
    let current: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE team_id = $1")
        .bind(scope.team.id)
        .fetch_one(&state.db)
        .await?;

    if current + payload.members.len() as i64 > limits.max_members_per_team {
        return Err(ApiError::precondition_failed(format!(
            "A team is only allowed to have {} members",
            limits.max_members_per_team
        )));
    }

    for requested in &payload.members {
        sqlx::query(
            r#"
            INSERT INTO members (id, user_id, team_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&requested.user_id)
        .bind(scope.team.id)
        .bind(requested.role.unwrap_or(MemberRole::User))
        .bind(Utc::now())
        .execute(&state.db)
        .await?;
    }

    Ok(ApiResponse::no_content())
}

/// DELETE /api/teams/:team_id/members - Remove members by membership id (admin)
pub async fn remove_members(
    State(state): State<AppState>,
    Extension(scope): Extension<TeamScope>,
    Json(payload): Json<RemoveMembersRequest>,
) -> ApiResult<()> {
    sqlx::query("DELETE FROM members WHERE team_id = $1 AND id = ANY($2)")
        .bind(scope.team.id)
        .bind(&payload.member_ids)
        .execute(&state.db)
        .await?;

    Ok(ApiResponse::no_content())
}

/// DELETE /api/teams/:team_id - Hard-delete a team and everything under it (admin)
///
/// Statements run in sequence, in dependency order, so no foreign key is
/// left dangling mid-delete:
/// 1. collect the team's channel ids
/// 2. delete chats referencing those channels
/// 3. delete the channels
/// 4. delete the memberships
/// 5. delete the team itself
pub async fn hard_delete(
    State(state): State<AppState>,
    Extension(scope): Extension<TeamScope>,
) -> ApiResult<()> {
    let channel_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM channels WHERE team_id = $1")
        .bind(scope.team.id)
        .fetch_all(&state.db)
        .await?;

    sqlx::query("DELETE FROM chats WHERE channel_id = ANY($1)")
        .bind(&channel_ids)
        .execute(&state.db)
        .await?;

    sqlx::query("DELETE FROM channels WHERE team_id = $1")
        .bind(scope.team.id)
        .execute(&state.db)
        .await?;

    sqlx::query("DELETE FROM members WHERE team_id = $1")
        .bind(scope.team.id)
        .execute(&state.db)
        .await?;

    sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(scope.team.id)
        .execute(&state.db)
        .await?;

    tracing::info!("Team '{}' hard-deleted", scope.team.id);
    Ok(ApiResponse::no_content())
}
