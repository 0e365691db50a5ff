mod common;

use chrono::Utc;
use futures::{FutureExt, StreamExt};
use tower::ServiceExt;
use uuid::Uuid;

use common::{body_json, handshake_request, test_state, StaticOracle};
use huddle_api::bus::ChatEventKind;
use huddle_api::chat::{ChatScope, ChatSession};
use huddle_api::database::models::Chat;
use huddle_api::routes;

fn channel_chat(channel_id: Uuid, author_id: &str) -> Chat {
    Chat {
        id: Uuid::new_v4(),
        message: "hello team".to_string(),
        channel_id: Some(channel_id),
        receiver_id: None,
        author_id: author_id.to_string(),
        created_at: Utc::now(),
    }
}

/// End-to-end over the in-process state: a handshake yields a key, and a
/// publish on the state's bus reaches exactly the session subscribed to
/// that channel.
#[tokio::test]
async fn publish_reaches_only_the_matching_channel_session() {
    let state = test_state(StaticOracle::accepting("user_alice"));

    let response = routes::app(state.clone())
        .oneshot(handshake_request())
        .await
        .expect("response");
    let key = body_json(response).await["data"]["key"]
        .as_str()
        .expect("key")
        .to_string();
    let user_id = state.tokens.validate(&key).expect("live key");

    let channel = Uuid::new_v4();
    let other_channel = Uuid::new_v4();
    let mut subscribed = ChatSession::open(
        &state.bus,
        ChatEventKind::MessageAddedToChannel,
        ChatScope::Channel(channel),
    );
    let mut bystander = ChatSession::open(
        &state.bus,
        ChatEventKind::MessageAddedToChannel,
        ChatScope::Channel(other_channel),
    );

    let chat = channel_chat(channel, &user_id);
    state
        .bus
        .publish(ChatEventKind::MessageAddedToChannel, &chat);

    let delivered = subscribed.next().await.expect("delivery");
    assert_eq!(delivered.id, chat.id);
    assert_eq!(delivered.channel_id, Some(channel));
    assert!(delivered.receiver_id.is_none());

    // Exactly one delivery: nothing queued for either session afterwards
    assert!(subscribed.next().now_or_never().is_none());
    assert!(bystander.next().now_or_never().is_none());
}

#[tokio::test]
async fn closed_sessions_receive_nothing() {
    let state = test_state(StaticOracle::accepting("user_alice"));
    let channel = Uuid::new_v4();

    let session = ChatSession::open(
        &state.bus,
        ChatEventKind::MessageAddedToChannel,
        ChatScope::Channel(channel),
    );
    drop(session);

    // The registry is empty again, so this publish fans out to no one
    state.bus.publish(
        ChatEventKind::MessageAddedToChannel,
        &channel_chat(channel, "user_alice"),
    );
    assert_eq!(
        state.bus.listener_count(ChatEventKind::MessageAddedToChannel),
        0
    );
}

#[tokio::test]
async fn direct_sessions_match_the_pair_in_both_directions() {
    let state = test_state(StaticOracle::accepting("user_alice"));

    let mut session = ChatSession::open(
        &state.bus,
        ChatEventKind::MessageAddedDirect,
        ChatScope::Direct {
            user_id: "user_alice".to_string(),
            remote_participant: "user_bob".to_string(),
        },
    );

    let inbound = Chat {
        id: Uuid::new_v4(),
        message: "hi alice".to_string(),
        channel_id: None,
        receiver_id: Some("user_alice".to_string()),
        author_id: "user_bob".to_string(),
        created_at: Utc::now(),
    };
    let unrelated = Chat {
        id: Uuid::new_v4(),
        message: "hi carol".to_string(),
        channel_id: None,
        receiver_id: Some("user_carol".to_string()),
        author_id: "user_bob".to_string(),
        created_at: Utc::now(),
    };

    state
        .bus
        .publish(ChatEventKind::MessageAddedDirect, &inbound);
    state
        .bus
        .publish(ChatEventKind::MessageAddedDirect, &unrelated);

    let delivered = session.next().await.expect("delivery");
    assert_eq!(delivered.id, inbound.id);
    assert!(session.next().now_or_never().is_none());
}
