use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Process-local store. Records do not survive a restart.
#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    records: DashMap<RefreshTokenId, RefreshTokenRecord>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        MemoryRefreshTokenStore {
            records: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn create(
        &self,
        secret_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenId, StoreError> {
        let id = RefreshTokenId::new_random();
        self.records.insert(
            id,
            RefreshTokenRecord {
                id,
                secret_hash: secret_hash.to_owned(),
                expires_at,
            },
        );
        Ok(id)
    }

    async fn get_by_id(&self, id: RefreshTokenId) -> Result<RefreshTokenRecord, StoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn delete_by_id(&self, id: RefreshTokenId) -> Result<DeleteOutcome, StoreError> {
        // The shard lock makes remove the single arbiter between racing callers.
        match self.records.remove(&id) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::AlreadyGone),
        }
    }

    async fn delete_all_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut removed = 0u64;
        self.records.retain(|_, record| {
            if record.is_expired_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    #[tokio::test]
    async fn delete_reports_whether_a_record_was_removed() {
        let store = MemoryRefreshTokenStore::new();
        let id = store
            .create("hash", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.delete_by_id(id).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(
            store.delete_by_id(id).await.unwrap(),
            DeleteOutcome::AlreadyGone
        );
        assert_matches!(store.get_by_id(id).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_records() {
        let store = MemoryRefreshTokenStore::new();
        let now = Utc::now();
        for _ in 0..4 {
            store.create("old", now - Duration::minutes(1)).await.unwrap();
        }
        let live = store.create("new", now + Duration::hours(1)).await.unwrap();

        assert_eq!(store.delete_all_expired().await.unwrap(), 4);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_id(live).await.unwrap().secret_hash, "new");
    }
}
