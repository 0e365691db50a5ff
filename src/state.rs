use std::sync::Arc;

use sqlx::PgPool;

use crate::bus::ChatBus;
use crate::identity::IdentityOracle;
use crate::tokens::TokenCache;

/// Shared application state, constructed once at startup and handed to the
/// router. The token cache and event bus are owned here rather than living
/// as module globals, so tests get fresh instances and the identity oracle
/// can be swapped for a mock.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: Arc<TokenCache>,
    pub bus: Arc<ChatBus>,
    pub identity: Arc<dyn IdentityOracle>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        tokens: Arc<TokenCache>,
        bus: Arc<ChatBus>,
        identity: Arc<dyn IdentityOracle>,
    ) -> Self {
        Self {
            db,
            tokens,
            bus,
            identity,
        }
    }
}
