use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;

const FIELD_HASH: &str = "h";
const FIELD_EXPIRES_AT: &str = "exp";

/// One Redis hash per record, expiring with the record itself.
pub struct RedisRefreshTokenStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisRefreshTokenStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRefreshTokenStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, id: &RefreshTokenId) -> String {
        format!("{}:{}", self.prefix, id)
    }

    fn fields_to_record(
        id: RefreshTokenId,
        mut fields: HashMap<String, String>,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let secret_hash = fields
            .remove(FIELD_HASH)
            .ok_or_else(|| StoreError::Backend(format!("record {id} has no hash field")))?;
        let expires_at = fields
            .get(FIELD_EXPIRES_AT)
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| StoreError::Backend(format!("record {id} has a bad expiry field")))?;

        Ok(RefreshTokenRecord {
            id,
            secret_hash,
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for RedisRefreshTokenStore {
    async fn create(
        &self,
        secret_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenId, StoreError> {
        let id = RefreshTokenId::new_random();
        let key = self.key(&id);
        let expires_at_ms = expires_at.timestamp_millis();
        let mut conn = self.conn.clone();

        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(
                &key,
                &[
                    (FIELD_HASH, secret_hash.to_owned()),
                    (FIELD_EXPIRES_AT, expires_at_ms.to_string()),
                ],
            )
            .ignore()
            .pexpire_at(&key, expires_at_ms)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(id)
    }

    async fn get_by_id(&self, id: RefreshTokenId) -> Result<RefreshTokenRecord, StoreError> {
        let key = self.key(&id);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if fields.is_empty() {
            return Err(StoreError::NotFound);
        }
        Self::fields_to_record(id, fields)
    }

    async fn delete_by_id(&self, id: RefreshTokenId) -> Result<DeleteOutcome, StoreError> {
        let key = self.key(&id);
        let mut conn = self.conn.clone();
        // DEL is atomic and reports how many keys it removed.
        let removed: i64 = conn
            .del(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if removed > 0 {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyGone)
        }
    }

    async fn delete_all_expired(&self) -> Result<u64, StoreError> {
        // Keys carry PEXPIREAT, so Redis never serves an expired record.
        Ok(0)
    }
}
