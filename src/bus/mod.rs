use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::database::models::Chat;

/// The fixed set of chat events that fan out to live subscribers. Every
/// event carries the full Chat record as payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatEventKind {
    MessageAddedToChannel,
    MessageAddedDirect,
    MessageDeletedFromChannel,
    MessageDeletedDirect,
}

type Listener = Arc<dyn Fn(&Chat) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<ChatEventKind, Vec<(u64, Listener)>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-wide publish/subscribe registry keyed by event kind.
///
/// Listeners must not block: production subscribers push the record into an
/// unbounded channel and return, so `publish` never waits on a slow
/// consumer. Delivery is fire-and-forget per listener.
#[derive(Default)]
pub struct ChatBus {
    registry: Arc<Mutex<Registry>>,
}

impl ChatBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `chat` to every listener currently registered for `kind`,
    /// in registration order. A listener that faults is isolated; the
    /// remaining listeners still receive the event.
    ///
    /// The listener list is snapshotted under the lock, so a listener
    /// registered before this call receives the event and one registered
    /// after does not, regardless of concurrent subscribe/unsubscribe
    /// churn.
    pub fn publish(&self, kind: ChatEventKind, chat: &Chat) {
        let snapshot: Vec<Listener> = {
            let registry = lock(&self.registry);
            registry
                .listeners
                .get(&kind)
                .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(chat))).is_err() {
                tracing::error!("Chat event listener panicked during {:?} delivery", kind);
            }
        }
    }

    /// Register `listener` for `kind`. The returned guard deregisters it
    /// exactly once, either explicitly via [`Subscription::unsubscribe`]
    /// or implicitly on drop.
    pub fn subscribe(
        &self,
        kind: ChatEventKind,
        listener: impl Fn(&Chat) + Send + Sync + 'static,
    ) -> Subscription {
        let id = {
            let mut registry = lock(&self.registry);
            registry.next_id += 1;
            let id = registry.next_id;
            registry
                .listeners
                .entry(kind)
                .or_default()
                .push((id, Arc::new(listener)));
            id
        };

        Subscription {
            registry: Arc::clone(&self.registry),
            kind,
            id,
            active: true,
        }
    }

    pub fn listener_count(&self, kind: ChatEventKind) -> usize {
        lock(&self.registry)
            .listeners
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Live registration on the bus. Dropping it removes the listener, which
/// ties subscriber lifetime to whatever owns the guard (for SSE sessions,
/// the response stream itself).
pub struct Subscription {
    registry: Arc<Mutex<Registry>>,
    kind: ChatEventKind,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            let mut registry = lock(&self.registry);
            if let Some(list) = registry.listeners.get_mut(&self.kind) {
                list.retain(|(listener_id, _)| *listener_id != self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn channel_chat(channel_id: Uuid) -> Chat {
        Chat {
            id: Uuid::new_v4(),
            message: "hello".to_string(),
            channel_id: Some(channel_id),
            receiver_id: None,
            author_id: "user_author".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = ChatBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let seen = Arc::clone(&seen);
            bus.subscribe(ChatEventKind::MessageAddedToChannel, move |_| {
                seen.lock().unwrap().push("first");
            })
        };
        let second = {
            let seen = Arc::clone(&seen);
            bus.subscribe(ChatEventKind::MessageAddedToChannel, move |_| {
                seen.lock().unwrap().push("second");
            })
        };

        bus.publish(
            ChatEventKind::MessageAddedToChannel,
            &channel_chat(Uuid::new_v4()),
        );

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
        drop((first, second));
    }

    #[test]
    fn unsubscribe_prevents_late_delivery() {
        let bus = ChatBus::new();
        let delivered = Arc::new(Mutex::new(0));

        let subscription = {
            let delivered = Arc::clone(&delivered);
            bus.subscribe(ChatEventKind::MessageAddedToChannel, move |_| {
                *delivered.lock().unwrap() += 1;
            })
        };

        subscription.unsubscribe();
        bus.publish(
            ChatEventKind::MessageAddedToChannel,
            &channel_chat(Uuid::new_v4()),
        );

        assert_eq!(*delivered.lock().unwrap(), 0);
        assert_eq!(bus.listener_count(ChatEventKind::MessageAddedToChannel), 0);
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let bus = ChatBus::new();
        {
            let _subscription = bus.subscribe(ChatEventKind::MessageAddedDirect, |_| {});
            assert_eq!(bus.listener_count(ChatEventKind::MessageAddedDirect), 1);
        }
        assert_eq!(bus.listener_count(ChatEventKind::MessageAddedDirect), 0);
    }

    #[test]
    fn kinds_are_isolated() {
        let bus = ChatBus::new();
        let delivered = Arc::new(Mutex::new(0));

        let _subscription = {
            let delivered = Arc::clone(&delivered);
            bus.subscribe(ChatEventKind::MessageAddedDirect, move |_| {
                *delivered.lock().unwrap() += 1;
            })
        };

        bus.publish(
            ChatEventKind::MessageAddedToChannel,
            &channel_chat(Uuid::new_v4()),
        );
        bus.publish(
            ChatEventKind::MessageDeletedDirect,
            &channel_chat(Uuid::new_v4()),
        );

        assert_eq!(*delivered.lock().unwrap(), 0);
    }

    #[test]
    fn faulting_listener_does_not_block_the_rest() {
        let bus = ChatBus::new();
        let delivered = Arc::new(Mutex::new(0));

        let _panicking = bus.subscribe(ChatEventKind::MessageAddedToChannel, |_| {
            panic!("listener fault");
        });
        let _counting = {
            let delivered = Arc::clone(&delivered);
            bus.subscribe(ChatEventKind::MessageAddedToChannel, move |_| {
                *delivered.lock().unwrap() += 1;
            })
        };

        bus.publish(
            ChatEventKind::MessageAddedToChannel,
            &channel_chat(Uuid::new_v4()),
        );

        assert_eq!(*delivered.lock().unwrap(), 1);
    }

    #[test]
    fn listener_registered_after_publish_sees_nothing() {
        let bus = ChatBus::new();
        bus.publish(
            ChatEventKind::MessageAddedToChannel,
            &channel_chat(Uuid::new_v4()),
        );

        let delivered = Arc::new(Mutex::new(0));
        let _subscription = {
            let delivered = Arc::clone(&delivered);
            bus.subscribe(ChatEventKind::MessageAddedToChannel, move |_| {
                *delivered.lock().unwrap() += 1;
            })
        };

        assert_eq!(*delivered.lock().unwrap(), 0);
    }
}
