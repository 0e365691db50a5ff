use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::bus::{ChatBus, ChatEventKind, Subscription};
use crate::database::models::Chat;

/// What a live subscription is allowed to see.
#[derive(Debug, Clone)]
pub enum ChatScope {
    /// Chats posted to one channel.
    Channel(Uuid),
    /// Direct chats between the subscribing user and one remote
    /// participant, in either direction.
    Direct {
        user_id: String,
        remote_participant: String,
    },
}

impl ChatScope {
    pub fn matches(&self, chat: &Chat) -> bool {
        match self {
            ChatScope::Channel(channel_id) => chat.channel_id == Some(*channel_id),
            ChatScope::Direct {
                user_id,
                remote_participant,
            } => match &chat.receiver_id {
                Some(receiver) => {
                    (chat.author_id == *user_id && receiver == remote_participant)
                        || (chat.author_id == *remote_participant && receiver == user_id)
                }
                None => false,
            },
        }
    }
}

/// One client's live subscription: a bus registration filtered by scope,
/// draining into the stream a transport (SSE) sends from.
///
/// The session holds its bus `Subscription`, so dropping the session on
/// any connection-exit path (normal close, error, cancellation)
/// synchronously deregisters the listener. There is no reconnect state;
/// a dropped transport means the client re-subscribes from scratch.
pub struct ChatSession {
    receiver: UnboundedReceiverStream<Chat>,
    _subscription: Subscription,
}

impl ChatSession {
    pub fn open(bus: &Arc<ChatBus>, kind: ChatEventKind, scope: ChatScope) -> Self {
        let (tx, receiver) = mpsc::unbounded_channel();

        let subscription = bus.subscribe(kind, move |chat| {
            if scope.matches(chat) {
                // Unbounded send keeps the publisher non-blocking; a send
                // into a session mid-teardown is dropped on the floor.
                let _ = tx.send(chat.clone());
            }
        });

        Self {
            receiver: UnboundedReceiverStream::new(receiver),
            _subscription: subscription,
        }
    }
}

impl Stream for ChatSession {
    type Item = Chat;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}
