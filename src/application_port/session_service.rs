use crate::domain_model::{AccessTokenClaims, UserId};
use serde::Serialize;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    Validation(String),
    // Kept opaque so callers cannot tell a missing record from a bad secret.
    #[error("unauthorized")]
    Unauthorized,
    #[error("store error: {0}")]
    Storage(String),
    #[error("signing error: {0}")]
    Signing(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

/// Raw refresh secret as handed to the client. Only its hash is persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshSecret(pub Vec<u8>);

impl fmt::Debug for RefreshSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefreshSecret(<{} bytes>)", self.0.len())
    }
}

impl RefreshSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: AccessToken,
    pub refresh_secret: RefreshSecret,
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Issue a fresh access token paired with a new single-use refresh secret.
    async fn create_session(
        &self,
        user_id: UserId,
        request_ip: &str,
    ) -> Result<Session, SessionError>;

    /// Exchange a previously issued pair for a new one, consuming the old
    /// refresh secret. The presented access token may already be expired.
    async fn refresh_session(
        &self,
        presented: &Session,
        request_ip: &str,
    ) -> Result<Session, SessionError>;

    /// Check an access token for a regular authenticated request, expiry included.
    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<AccessTokenClaims, SessionError>;
}
