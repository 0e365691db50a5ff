use axum::extract::RawPathParams;
use uuid::Uuid;

use crate::error::ApiError;

pub mod auth;
pub mod channel;
pub mod response;
pub mod team;

pub use auth::{require_capability_key, AuthUser};
pub use channel::{require_channel, ChannelScope};
pub use response::{ApiResponse, ApiResult};
pub use team::{require_team_admin, require_team_member, TeamScope};

/// Pull a uuid path parameter out of the matched route.
pub(crate) fn path_uuid(params: &RawPathParams, name: &str) -> Result<Uuid, ApiError> {
    let raw = params
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .ok_or_else(|| {
            ApiError::internal_server_error(format!("Route is missing the :{} parameter", name))
        })?;

    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("'{}' is not a valid {}", raw, name)))
}
