use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result of a conditional delete. Only the caller that sees `Deleted` owns
/// the record's consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}

#[async_trait::async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new record. The store picks the identifier.
    async fn create(
        &self,
        secret_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenId, StoreError>;

    /// Fails with `StoreError::NotFound` if the record is absent.
    async fn get_by_id(&self, id: RefreshTokenId) -> Result<RefreshTokenRecord, StoreError>;

    /// Atomically remove a record. Concurrent callers for the same id see at
    /// most one `Deleted`.
    async fn delete_by_id(&self, id: RefreshTokenId) -> Result<DeleteOutcome, StoreError>;

    /// Remove every record whose expiration is at or before now. Returns the
    /// number of removed records.
    async fn delete_all_expired(&self) -> Result<u64, StoreError>;
}
