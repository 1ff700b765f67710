use super::util::is_duplicate_entry;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

const MAX_CREATE_ATTEMPTS: usize = 3;

pub struct MySqlRefreshTokenStore {
    pool: MySqlPool,
}

impl MySqlRefreshTokenStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRefreshTokenStore { pool }
    }

    #[inline]
    fn id_as_bytes(id: &RefreshTokenId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn id_from_bytes(id: &[u8]) -> Result<RefreshTokenId, StoreError> {
        Ok(RefreshTokenId(
            Uuid::from_slice(id).map_err(|e| StoreError::Backend(e.to_string()))?,
        ))
    }

    fn row_to_record(row: MySqlRow) -> Result<RefreshTokenRecord, StoreError> {
        let id_bytes: Vec<u8> = row
            .try_get("id")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let id = Self::id_from_bytes(&id_bytes)?;

        let secret_hash: String = row
            .try_get("secret_hash")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(RefreshTokenRecord {
            id,
            secret_hash,
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for MySqlRefreshTokenStore {
    async fn create(
        &self,
        secret_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenId, StoreError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let id = RefreshTokenId::new_random();

            let result = sqlx::query(
                r#"
INSERT INTO refresh_token (id, secret_hash, expires_at)
VALUES (?, ?, ?)
"#,
            )
            .bind(Self::id_as_bytes(&id))
            .bind(secret_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => return Ok(id),
                Err(e) if is_duplicate_entry(&e) && attempt < MAX_CREATE_ATTEMPTS => continue,
                Err(e) => return Err(StoreError::Backend(format!("insert refresh token: {e}"))),
            }
        }
    }

    async fn get_by_id(&self, id: RefreshTokenId) -> Result<RefreshTokenRecord, StoreError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, secret_hash, expires_at
FROM refresh_token
WHERE id = ?
"#,
        )
        .bind(Self::id_as_bytes(&id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("select refresh token: {e}")))?;

        match row_opt {
            Some(row) => Self::row_to_record(row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_by_id(&self, id: RefreshTokenId) -> Result<DeleteOutcome, StoreError> {
        // InnoDB serialises deletes on the primary key; exactly one statement
        // can observe the row.
        let result = sqlx::query("DELETE FROM refresh_token WHERE id = ?")
            .bind(Self::id_as_bytes(&id))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("delete refresh token: {e}")))?;

        if result.rows_affected() > 0 {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyGone)
        }
    }

    async fn delete_all_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("delete expired refresh tokens: {e}")))?;

        Ok(result.rows_affected())
    }
}
