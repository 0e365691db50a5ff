use async_trait::async_trait;
use thiserror::Error;

pub mod clerk;

pub use clerk::ClerkOracle;

/// Outcome of a successful session verification.
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub user_id: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider rejected the credentials")]
    Rejected,

    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// External identity provider, treated as an opaque verification oracle.
/// The handshake exchanges its session proof for a capability key; direct
/// messaging uses it to confirm recipient user ids exist.
#[async_trait]
pub trait IdentityOracle: Send + Sync {
    /// Verify a provider session id + proof token, returning the owning user.
    async fn verify_session(
        &self,
        session_id: &str,
        token: &str,
    ) -> Result<VerifiedSession, IdentityError>;

    /// Confirm a user id is known to the provider.
    async fn verify_user(&self, user_id: &str) -> Result<(), IdentityError>;
}
