use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::ExpiryReaper;
use crate::settings::Settings;
use anyhow::{anyhow, bail};
use chrono::{TimeDelta, Utc};
use sqlx::MySqlPool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the session engine and its background work for the process lifetime.
///
/// Construction wires components only. The expiry reaper runs between
/// `start` and `shutdown`.
pub struct Server {
    pub session_service: Arc<dyn SessionService>,
    store: Arc<dyn RefreshTokenStore>,
    dispatcher: Arc<SpawningDispatcher>,
    reaper_period: Duration,
    reaper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        if settings.session.signing_key.is_empty() {
            bail!("session.signing_key is empty; set CADENCE__SESSION__SIGNING_KEY");
        }
        if settings.reaper.period_secs == 0 {
            bail!("reaper.period_secs must be greater than zero");
        }
        let session_config = SessionConfig {
            access_ttl: ttl("session.access_ttl_secs", settings.session.access_ttl_secs)?,
            refresh_ttl: ttl("session.refresh_ttl_secs", settings.session.refresh_ttl_secs)?,
        };

        let mut pool: Option<MySqlPool> = None;
        let store: Arc<dyn RefreshTokenStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryRefreshTokenStore::new()),
            "mysql" => {
                let dsn = settings
                    .store
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.mysql_dsn is required by the mysql backend"))?;
                let mysql = MySqlPool::connect(dsn).await?;
                if settings.store.run_migrations {
                    run_migrations(&mysql).await?;
                    info!("database migrations applied");
                }
                pool = Some(mysql.clone());
                Arc::new(MySqlRefreshTokenStore::new(mysql))
            }
            "redis" => {
                let dsn = settings
                    .store
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.redis_dsn is required by the redis backend"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisRefreshTokenStore::new(
                    redis_manager,
                    settings.store.redis_prefix.clone(),
                ))
            }
            other => bail!("Unknown store backend: {}", other),
        };

        let sink: Arc<dyn NotificationSink> = match settings.notification.backend.as_str() {
            "log" => Arc::new(LogNotificationSink),
            "outbox" => match &pool {
                Some(mysql) => Arc::new(MySqlNotificationOutbox::new(mysql.clone())),
                None => bail!("the outbox notification backend needs the mysql store"),
            },
            other => bail!("Unknown notification backend: {}", other),
        };
        let dispatcher = Arc::new(SpawningDispatcher::new(sink));

        let secret_hasher: Arc<dyn SecretHasher> = Arc::new(Argon2SecretHasher::with_cost(
            settings.hasher.memory_kib,
            settings.hasher.iterations,
            settings.hasher.parallelism,
        )?);
        let token_codec: Arc<dyn TokenCodec> =
            Arc::new(JwtHs512Codec::new(settings.session.signing_key.as_bytes()));

        let session_service: Arc<dyn SessionService> = Arc::new(RealSessionService::new(
            store.clone(),
            secret_hasher,
            token_codec,
            dispatcher.clone(),
            session_config,
        ));

        info!(
            store = %settings.store.backend,
            notification = %settings.notification.backend,
            "server initialised"
        );

        Ok(Self {
            session_service,
            store,
            dispatcher,
            reaper_period: Duration::from_secs(settings.reaper.period_secs),
            reaper_handle: Mutex::new(None),
            cancel: CancellationToken::new(),
            pool,
        })
    }

    /// Spawn the expiry reaper. Calling it twice is a no-op.
    pub fn start(&self) {
        let Ok(mut lock) = self.reaper_handle.lock() else {
            error!("reaper handle lock poisoned; reaper not started");
            return;
        };
        if lock.is_some() {
            warn!("server already started");
            return;
        }

        let reaper = ExpiryReaper::new(self.store.clone(), self.reaper_period, self.cancel.clone());
        *lock = Some(tokio::spawn(async move { reaper.run().await }));
        info!(period = ?self.reaper_period, "expiry reaper started");
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = match self.reaper_handle.lock() {
            Ok(mut lock) => lock.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let r = handle.await;
            info!("reaper handle dropped: {:?}", r);
        }

        self.dispatcher.close_and_wait().await;

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

/// A lifetime must be positive and still representable once added to now.
fn ttl(name: &str, secs: u64) -> anyhow::Result<Duration> {
    if secs == 0 {
        bail!("{name} must be greater than zero");
    }
    let ttl = Duration::from_secs(secs);
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| anyhow!("{name} is out of range: {secs}"))?;
    Ok(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::parse_settings;

    fn dev_settings() -> Settings {
        let mut settings = parse_settings(Some("settings/dev.toml")).unwrap();
        settings.hasher.memory_kib = 8;
        settings.hasher.iterations = 1;
        settings.hasher.parallelism = 1;
        settings
    }

    async fn startup_error(settings: &Settings) -> String {
        match Server::try_new(settings).await {
            Ok(_) => panic!("server started with invalid settings"),
            Err(e) => e.to_string(),
        }
    }

    #[tokio::test]
    async fn starts_and_shuts_down_with_dev_settings() {
        let server = Server::try_new(&dev_settings()).await.unwrap();
        server.start();
        server.start();
        server.shutdown().await;
    }

    #[tokio::test]
    async fn rejects_zero_reaper_period() {
        let mut settings = dev_settings();
        settings.reaper.period_secs = 0;

        assert!(startup_error(&settings).await.contains("reaper.period_secs"));
    }

    #[tokio::test]
    async fn rejects_unusable_session_lifetimes() {
        let mut settings = dev_settings();
        settings.session.access_ttl_secs = 0;
        assert!(startup_error(&settings).await.contains("session.access_ttl_secs"));

        let mut settings = dev_settings();
        settings.session.refresh_ttl_secs = u64::MAX;
        assert!(startup_error(&settings).await.contains("session.refresh_ttl_secs"));
    }

    #[test]
    fn accepts_configured_lifetimes() {
        assert_eq!(
            ttl("session.access_ttl_secs", 7200).unwrap(),
            Duration::from_secs(7200)
        );
    }
}
