use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::protected::{channels, chats, direct, teams};
use crate::handlers::public::handshake;
use crate::middleware;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    // Everything under /api sits behind the capability-key check; the
    // team/channel groups stack their own scoping layers on top.
    let api = user_routes()
        .merge(team_routes(&state))
        .merge(channel_routes(&state))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_capability_key,
        ));

    let router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/handshake", post(handshake::handshake_post))
        // Protected API
        .merge(api)
        // Global middleware
        .layer(TraceLayer::new_for_http());

    let router = if crate::config::config().server.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// Routes any authenticated user may call (layer 1 only).
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/teams", get(teams::get_all).post(teams::create))
        .route(
            "/api/direct/:user_id/chats",
            get(direct::get_with_user).post(direct::send_to_user),
        )
        .route(
            "/api/direct/:user_id/chats/:chat_id",
            delete(direct::delete_chat),
        )
        .route(
            "/api/direct/:user_id/chats/live/added",
            get(direct::live_added),
        )
        .route(
            "/api/direct/:user_id/chats/live/deleted",
            get(direct::live_deleted),
        )
}

/// Team-scoped routes (layers 1+2), split by required role.
fn team_routes(state: &AppState) -> Router<AppState> {
    let member = Router::new()
        .route("/api/teams/:team_id", get(teams::get_by_id))
        .route("/api/teams/:team_id/channels", get(channels::get_all))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_team_member,
        ));

    let admin = Router::new()
        .route(
            "/api/teams/:team_id",
            put(teams::update).delete(teams::hard_delete),
        )
        .route("/api/teams/:team_id/channels", post(channels::create))
        .route(
            "/api/teams/:team_id/members",
            post(teams::add_members).delete(teams::remove_members),
        )
        .route(
            "/api/teams/:team_id/members/:member_id/role",
            put(teams::update_member_role),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_team_admin,
        ));

    member.merge(admin)
}

/// Channel-scoped routes (layers 1+2+3). route_layer wraps inside-out, so
/// the team layer added last runs before the channel layer.
fn channel_routes(state: &AppState) -> Router<AppState> {
    let member = Router::new()
        .route(
            "/api/teams/:team_id/channels/:channel_id",
            get(channels::get_by_id),
        )
        .route(
            "/api/teams/:team_id/channels/:channel_id/chats",
            get(chats::get_for_channel).post(chats::send_to_channel),
        )
        .route(
            "/api/teams/:team_id/channels/:channel_id/chats/:chat_id",
            delete(chats::delete_from_channel),
        )
        .route(
            "/api/teams/:team_id/channels/:channel_id/chats/live/added",
            get(chats::live_added),
        )
        .route(
            "/api/teams/:team_id/channels/:channel_id/chats/live/deleted",
            get(chats::live_deleted),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_channel,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_team_member,
        ));

    let admin = Router::new()
        .route(
            "/api/teams/:team_id/channels/:channel_id",
            put(channels::update).delete(channels::delete),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_channel,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_team_admin,
        ));

    member.merge(admin)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Huddle API",
            "version": version,
            "description": "Team chat backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "handshake": "/handshake (public - capability key acquisition)",
                "teams": "/api/teams[/:team_id] (protected)",
                "members": "/api/teams/:team_id/members (protected, admin)",
                "channels": "/api/teams/:team_id/channels[/:channel_id] (protected)",
                "chats": "/api/teams/:team_id/channels/:channel_id/chats (protected)",
                "direct": "/api/direct/:user_id/chats (protected)",
                "live": ".../chats/live/{added,deleted} (protected, SSE)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::health_check(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
