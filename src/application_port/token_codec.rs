use super::AccessToken;
use crate::domain_model::AccessTokenClaims;

/// Whether `decode` rejects tokens past their `exp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Enforce,
    Skip,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token algorithm is not accepted")]
    AlgorithmMismatch,
    #[error("token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn encode(&self, claims: &AccessTokenClaims) -> Result<AccessToken, TokenError>;
    async fn decode(
        &self,
        token: &AccessToken,
        freshness: Freshness,
    ) -> Result<AccessTokenClaims, TokenError>;
}
