use crate::application_port::NotificationDispatcher;
use crate::domain_model::*;
use crate::domain_port::NotificationSink;
use crate::logger::*;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// Delivers each notification on its own task, once, with no retry.
pub struct SpawningDispatcher {
    sink: Arc<dyn NotificationSink>,
    tracker: TaskTracker,
}

impl SpawningDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            tracker: TaskTracker::new(),
        }
    }

    /// Wait for deliveries already in flight. Later dispatches still run but
    /// are not waited for.
    pub async fn close_and_wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl NotificationDispatcher for SpawningDispatcher {
    fn dispatch(&self, user_id: UserId, content: NotificationContent) {
        let sink = self.sink.clone();
        self.tracker.spawn(async move {
            match sink.notify(user_id, &content).await {
                Ok(()) => debug!(%user_id, "notification delivered"),
                Err(e) => error!(%user_id, "notification delivery failed: {:#}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct GatedSink {
        gate: Arc<Notify>,
        delivered: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl NotificationSink for GatedSink {
        async fn notify(&self, _: UserId, _: &NotificationContent) -> anyhow::Result<()> {
            self.gate.notified().await;
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingSink {
        attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl NotificationSink for FailingSink {
        async fn notify(&self, _: UserId, _: &NotificationContent) -> anyhow::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("smtp unavailable"))
        }
    }

    fn content() -> NotificationContent {
        NotificationContent::refresh_from_new_ip("1.1.1.1", "2.2.2.2", chrono::Utc::now())
    }

    #[tokio::test]
    async fn dispatch_does_not_wait_for_delivery() {
        let gate = Arc::new(Notify::new());
        let sink = Arc::new(GatedSink {
            gate: gate.clone(),
            delivered: AtomicUsize::new(0),
        });
        let dispatcher = SpawningDispatcher::new(sink.clone());

        dispatcher.dispatch(UserId(uuid::Uuid::new_v4()), content());
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 0);

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(5), dispatcher.close_and_wait())
            .await
            .unwrap();
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_delivery_is_attempted_once() {
        let sink = Arc::new(FailingSink {
            attempts: AtomicUsize::new(0),
        });
        let dispatcher = SpawningDispatcher::new(sink.clone());

        dispatcher.dispatch(UserId(uuid::Uuid::new_v4()), content());
        dispatcher.close_and_wait().await;

        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
    }
}
