use crate::domain_model::*;

/// Outbound delivery channel behind the notification dispatcher.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: UserId, content: &NotificationContent) -> anyhow::Result<()>;
}
