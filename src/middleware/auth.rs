use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context resolved from a capability key
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
}

/// Layer 1 of the authorization chain: resolve the capability key minted by
/// the handshake into a user id via the token cache, and inject the result
/// into the request. Unknown or expired keys abort the request.
pub async fn require_capability_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = extract_key_from_headers(&headers).map_err(ApiError::unauthorized)?;

    let user_id = state.tokens.validate(&key).ok_or_else(|| {
        tracing::debug!("Capability key rejected: unknown or expired");
        ApiError::unauthorized("Capability key is unknown or expired")
    })?;

    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}

/// Extract the capability key from `Authorization: Bearer` or, for
/// EventSource clients that cannot set arbitrary auth headers through
/// every proxy, from `X-Capability-Key`.
fn extract_key_from_headers(headers: &HeaderMap) -> Result<String, String> {
    if let Some(auth_header) = headers.get("authorization") {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| "Invalid Authorization header format".to_string())?;

        return if let Some(key) = auth_str.strip_prefix("Bearer ") {
            if key.trim().is_empty() {
                Err("Empty capability key".to_string())
            } else {
                Ok(key.to_string())
            }
        } else {
            Err("Authorization header must use Bearer token format".to_string())
        };
    }

    if let Some(header) = headers.get("x-capability-key") {
        let key = header
            .to_str()
            .map_err(|_| "Invalid X-Capability-Key header format".to_string())?;
        if key.trim().is_empty() {
            return Err("Empty capability key".to_string());
        }
        return Ok(key.to_string());
    }

    Err("Missing Authorization header".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_key() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc-123"));
        assert_eq!(extract_key_from_headers(&headers).unwrap(), "abc-123");
    }

    #[test]
    fn extracts_capability_header_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-capability-key", HeaderValue::from_static("abc-123"));
        assert_eq!(extract_key_from_headers(&headers).unwrap(), "abc-123");
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        assert!(extract_key_from_headers(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_key_from_headers(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(extract_key_from_headers(&headers).is_err());
    }
}
