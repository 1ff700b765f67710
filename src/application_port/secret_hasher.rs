use super::SessionError;

#[async_trait::async_trait]
pub trait SecretHasher: Send + Sync {
    async fn hash_secret(&self, secret: &[u8]) -> Result<String, SessionError>;
    async fn verify_secret(&self, secret: &[u8], secret_hash: &str) -> Result<bool, SessionError>;
}
