use crate::domain_model::{NotificationContent, UserId};

/// Fire-and-forget delivery of security notifications.
///
/// `dispatch` must return without waiting for delivery. Each notification is
/// attempted at most once and is never retried; failures stay inside the
/// dispatcher.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, user_id: UserId, content: NotificationContent);
}
