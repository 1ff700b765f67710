use cadence::application_impl::*;
use cadence::application_port::*;
use cadence::domain_model::UserId;
use cadence::infra_memory::MemoryRefreshTokenStore;
use cadence::logger::*;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Walks one user through issue, refresh from a new address and a replay race
/// against the in-memory store.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "cadence=debug,session_demo=info".to_string(),
    })?;

    let store = Arc::new(MemoryRefreshTokenStore::new());
    let dispatcher = Arc::new(SpawningDispatcher::new(Arc::new(LogNotificationSink)));
    let service = RealSessionService::new(
        store.clone(),
        Arc::new(Argon2SecretHasher::default()),
        Arc::new(JwtHs512Codec::new(b"session-demo-key")),
        dispatcher.clone(),
        SessionConfig {
            access_ttl: Duration::from_secs(2 * 60 * 60),
            refresh_ttl: Duration::from_secs(12 * 60 * 60),
        },
    );

    let user_id = UserId(uuid::Uuid::new_v4());
    let issued = service.create_session(user_id, "1.1.1.1").await?;
    info!(%user_id, live_records = store.len(), "session issued from 1.1.1.1");

    let rotated = service.refresh_session(&issued, "2.2.2.2").await?;
    info!(live_records = store.len(), "session refreshed from 2.2.2.2");

    match service.refresh_session(&issued, "2.2.2.2").await {
        Ok(_) => error!("replay of a consumed pair was accepted"),
        Err(e) => info!(error = %e, "replay of the consumed pair rejected"),
    }

    let racers = (0..4).map(|_| service.refresh_session(&rotated, "2.2.2.2"));
    let outcomes = join_all(racers).await;
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    info!(
        attempts = outcomes.len(),
        winners,
        live_records = store.len(),
        "concurrent refresh of one pair"
    );

    dispatcher.close_and_wait().await;
    Ok(())
}
