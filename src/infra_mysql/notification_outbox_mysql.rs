use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::Context;
use sqlx::MySqlPool;

/// Queues notifications in `notification_outbox` for an external mailer.
pub struct MySqlNotificationOutbox {
    pool: MySqlPool,
}

impl MySqlNotificationOutbox {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlNotificationOutbox { pool }
    }
}

#[async_trait::async_trait]
impl NotificationSink for MySqlNotificationOutbox {
    async fn notify(&self, user_id: UserId, content: &NotificationContent) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO notification_outbox (user_id, subject, content_type, body)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(user_id.0.as_bytes() as &[u8])
        .bind(&content.subject)
        .bind(&content.content_type)
        .bind(&content.body)
        .execute(&self.pool)
        .await
        .context("enqueue notification")?;

        Ok(())
    }
}
