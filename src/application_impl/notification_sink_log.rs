use crate::domain_model::*;
use crate::domain_port::NotificationSink;
use crate::logger::*;

/// Writes notifications to the log instead of delivering them.
pub struct LogNotificationSink;

#[async_trait::async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, user_id: UserId, content: &NotificationContent) -> anyhow::Result<()> {
        warn!(
            %user_id,
            subject = %content.subject,
            body = %content.body,
            "security notification"
        );
        Ok(())
    }
}
