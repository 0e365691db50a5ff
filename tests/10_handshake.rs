mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{body_json, handshake_request, test_state, StaticOracle};
use huddle_api::routes;

#[tokio::test]
async fn handshake_mints_a_working_capability_key() {
    let state = test_state(StaticOracle::accepting("user_alice"));
    let app = routes::app(state.clone());

    let response = app.oneshot(handshake_request()).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    let key = body["data"]["key"].as_str().expect("key").to_string();
    assert_eq!(state.tokens.validate(&key), Some("user_alice".to_string()));
}

#[tokio::test]
async fn repeat_handshake_invalidates_the_previous_key() {
    let state = test_state(StaticOracle::accepting("user_alice"));

    let first = body_json(
        routes::app(state.clone())
            .oneshot(handshake_request())
            .await
            .expect("response"),
    )
    .await["data"]["key"]
        .as_str()
        .expect("key")
        .to_string();

    let second = body_json(
        routes::app(state.clone())
            .oneshot(handshake_request())
            .await
            .expect("response"),
    )
    .await["data"]["key"]
        .as_str()
        .expect("key")
        .to_string();

    assert_ne!(first, second);
    assert_eq!(state.tokens.validate(&first), None);
    assert_eq!(
        state.tokens.validate(&second),
        Some("user_alice".to_string())
    );
}

#[tokio::test]
async fn handshake_rejected_by_the_identity_oracle_is_unauthenticated() {
    let state = test_state(StaticOracle::rejecting());
    let app = routes::app(state.clone());

    let response = app.oneshot(handshake_request()).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHENTICATED");
    assert_eq!(state.tokens.live_key_count(), 0);
}

#[tokio::test]
async fn protected_routes_require_a_capability_key() {
    let state = test_state(StaticOracle::accepting("user_alice"));
    let app = routes::app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/teams")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn protected_routes_reject_unknown_keys() {
    let state = test_state(StaticOracle::accepting("user_alice"));
    let app = routes::app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/teams")
                .header("authorization", "Bearer not-a-real-key")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
