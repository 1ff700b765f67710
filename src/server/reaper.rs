use crate::domain_port::RefreshTokenStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REAPER_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Periodically removes expired refresh-token records.
///
/// A failed sweep is logged and the next tick tries again; only the
/// cancellation token stops the loop.
pub struct ExpiryReaper {
    store: Arc<dyn RefreshTokenStore>,
    period: Duration,
    cancellation_token: CancellationToken,
}

impl ExpiryReaper {
    pub fn new(
        store: Arc<dyn RefreshTokenStore>,
        period: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            period,
            cancellation_token,
        }
    }

    pub async fn sweep_once(&self) -> anyhow::Result<u64> {
        Ok(self.store.delete_all_expired().await?)
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("expiry reaper shutting down...");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(0) => {}
                        Ok(removed) => tracing::debug!(removed, "expired refresh tokens removed"),
                        Err(e) => tracing::error!("expiry reaper sweep failed: {:#}", e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::*;
    use crate::domain_port::*;
    use crate::infra_memory::MemoryRefreshTokenStore;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyStore {
        sweeps: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl RefreshTokenStore for FlakyStore {
        async fn create(&self, _: &str, _: DateTime<Utc>) -> Result<RefreshTokenId, StoreError> {
            unreachable!()
        }
        async fn get_by_id(&self, _: RefreshTokenId) -> Result<RefreshTokenRecord, StoreError> {
            unreachable!()
        }
        async fn delete_by_id(&self, _: RefreshTokenId) -> Result<DeleteOutcome, StoreError> {
            unreachable!()
        }
        async fn delete_all_expired(&self) -> Result<u64, StoreError> {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Backend("lock wait timeout".to_string()))
        }
    }

    #[tokio::test]
    async fn sweep_leaves_only_unexpired_records() {
        let store = Arc::new(MemoryRefreshTokenStore::new());
        let now = Utc::now();
        for _ in 0..5 {
            store
                .create("expired", now - chrono::Duration::seconds(1))
                .await
                .unwrap();
        }
        for _ in 0..3 {
            store
                .create("live", now + chrono::Duration::hours(1))
                .await
                .unwrap();
        }
        let reaper = ExpiryReaper::new(store.clone(), DEFAULT_REAPER_PERIOD, CancellationToken::new());

        assert_eq!(reaper.sweep_once().await.unwrap(), 5);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_running_after_failed_sweeps() {
        let store = Arc::new(FlakyStore {
            sweeps: AtomicUsize::new(0),
        });
        let cancel = CancellationToken::new();
        let reaper = ExpiryReaper::new(store.clone(), Duration::from_secs(60), cancel.clone());
        let handle = tokio::spawn(async move { reaper.run().await });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.sweeps.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(60 * 3)).await;
        assert_eq!(store.sweeps.load(Ordering::SeqCst), 3);
        assert!(!handle.is_finished());

        cancel.cancel();
        handle.await.unwrap();
    }
}
