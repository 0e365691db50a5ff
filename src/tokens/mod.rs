use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

struct TokenEntry {
    user_id: String,
    last_fetched: Instant,
}

/// In-memory capability-key store. Maps opaque keys to verified user ids
/// with a freshness deadline. Never persisted; entries live for at most
/// the configured TTL and a user owns at most one live key at a time.
///
/// Constructed once at process start and shared through `AppState`, so
/// tests get isolation from fresh instances.
pub struct TokenCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, TokenEntry>>,
}

impl TokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config() -> Self {
        let minutes = crate::config::config().session.key_ttl_minutes;
        Self::new(Duration::from_secs(minutes * 60))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenEntry>> {
        // A poisoning panic cannot leave the map in a half-mutated state:
        // every mutation below is a single insert/remove/retain.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mint a fresh key for `user_id`, invalidating any key the user
    /// already owns. The key is unique among currently-live keys; the
    /// generator retries on (vanishingly unlikely) collision.
    pub fn issue(&self, user_id: &str) -> String {
        let mut entries = self.lock();

        entries.retain(|_, entry| entry.user_id != user_id);

        let mut key = Uuid::new_v4().to_string();
        while entries.contains_key(&key) {
            key = Uuid::new_v4().to_string();
        }

        entries.insert(
            key.clone(),
            TokenEntry {
                user_id: user_id.to_string(),
                last_fetched: Instant::now(),
            },
        );
        key
    }

    /// Resolve a key to its user id. Returns `None` for unknown keys and
    /// for entries aged past the TTL (which are evicted on the spot).
    /// A successful read does not refresh the freshness deadline.
    pub fn validate(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();

        let entry = entries.get(key)?;
        if entry.last_fetched.elapsed() >= self.ttl {
            entries.remove(key);
            return None;
        }
        Some(entry.user_id.clone())
    }

    /// Evict every entry aged past the TTL. Idempotent; runs on a periodic
    /// background tick so abandoned sessions cannot grow the map unbounded.
    pub fn sweep(&self) {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.last_fetched.elapsed() < self.ttl);

        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!("Swept {} expired capability keys", evicted);
        }
    }

    pub fn live_key_count(&self) -> usize {
        self.lock().len()
    }
}

/// Background sweep independent of request traffic.
pub fn spawn_sweeper(cache: Arc<TokenCache>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            cache.sweep();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_TTL: Duration = Duration::from_secs(3600);

    #[test]
    fn issue_returns_distinct_keys_and_invalidates_prior_session() {
        let cache = TokenCache::new(LONG_TTL);

        let first = cache.issue("user_1");
        let second = cache.issue("user_1");

        assert_ne!(first, second);
        assert_eq!(cache.validate(&first), None);
        assert_eq!(cache.validate(&second), Some("user_1".to_string()));
        assert_eq!(cache.live_key_count(), 1);
    }

    #[test]
    fn issue_keeps_other_users_keys_alive() {
        let cache = TokenCache::new(LONG_TTL);

        let alice = cache.issue("user_alice");
        let bob = cache.issue("user_bob");

        assert_eq!(cache.validate(&alice), Some("user_alice".to_string()));
        assert_eq!(cache.validate(&bob), Some("user_bob".to_string()));
    }

    #[test]
    fn validate_rejects_unknown_keys() {
        let cache = TokenCache::new(LONG_TTL);
        assert_eq!(cache.validate("not-a-key"), None);
    }

    #[test]
    fn validate_evicts_expired_entries() {
        let cache = TokenCache::new(Duration::ZERO);

        let key = cache.issue("user_1");
        assert_eq!(cache.live_key_count(), 1);

        assert_eq!(cache.validate(&key), None);
        assert_eq!(cache.live_key_count(), 0);
    }

    #[test]
    fn validate_does_not_refresh_the_deadline() {
        let cache = TokenCache::new(Duration::from_millis(100));
        let key = cache.issue("user_1");

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.validate(&key), Some("user_1".to_string()));

        // If the read above had refreshed last_fetched, the key would
        // still be valid here.
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.validate(&key), None);
    }

    #[test]
    fn sweep_is_idempotent() {
        let cache = TokenCache::new(Duration::ZERO);
        cache.issue("user_1");
        cache.issue("user_2");

        cache.sweep();
        assert_eq!(cache.live_key_count(), 0);

        cache.sweep();
        assert_eq!(cache.live_key_count(), 0);
    }

    #[test]
    fn sweep_leaves_fresh_entries() {
        let cache = TokenCache::new(LONG_TTL);
        let key = cache.issue("user_1");

        cache.sweep();
        assert_eq!(cache.validate(&key), Some("user_1".to_string()));
    }
}
