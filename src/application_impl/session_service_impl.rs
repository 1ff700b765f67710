use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, TimeDelta, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Length of a raw refresh secret in bytes.
pub const REFRESH_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

pub struct RealSessionService {
    store: Arc<dyn RefreshTokenStore>,
    secret_hasher: Arc<dyn SecretHasher>,
    token_codec: Arc<dyn TokenCodec>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: SessionConfig,
}

impl RealSessionService {
    pub fn new(
        store: Arc<dyn RefreshTokenStore>,
        secret_hasher: Arc<dyn SecretHasher>,
        token_codec: Arc<dyn TokenCodec>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            secret_hasher,
            token_codec,
            dispatcher,
            config,
        }
    }

    fn generate_refresh_secret() -> Result<RefreshSecret, SessionError> {
        let mut bytes = vec![0u8; REFRESH_SECRET_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SessionError::Internal(format!("generate refresh secret: {e}")))?;
        Ok(RefreshSecret(bytes))
    }

    fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, SessionError> {
        TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| SessionError::Internal(format!("ttl out of range: {ttl:?}")))
    }

    fn validate_ip(request_ip: &str) -> Result<(), SessionError> {
        if request_ip.trim().is_empty() {
            return Err(SessionError::Validation(
                "request ip must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn storage(e: StoreError) -> SessionError {
        SessionError::Storage(e.to_string())
    }

    fn rejected(reason: &str) -> SessionError {
        debug!(reason, "refresh rejected");
        SessionError::Unauthorized
    }
}

/// Compares two addresses as seen by the transport. Parseable addresses are
/// canonicalised first so an IPv4-mapped IPv6 peer equals its IPv4 form.
fn same_address(a: &str, b: &str) -> bool {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a.to_canonical() == b.to_canonical(),
        _ => a == b,
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn create_session(
        &self,
        user_id: UserId,
        request_ip: &str,
    ) -> Result<Session, SessionError> {
        Self::validate_ip(request_ip)?;

        let refresh_secret = Self::generate_refresh_secret()?;
        let secret_hash = self
            .secret_hasher
            .hash_secret(refresh_secret.as_bytes())
            .await?;

        let now = Utc::now();
        let refresh_token_id = self
            .store
            .create(&secret_hash, Self::expiry(now, self.config.refresh_ttl)?)
            .await
            .map_err(Self::storage)?;

        // A failure past this point leaves an orphan record; the reaper collects it.
        let claims = AccessTokenClaims {
            subject: user_id,
            ip: request_ip.to_owned(),
            expires_at: Self::expiry(now, self.config.access_ttl)?,
            refresh_token_id,
        };
        let access_token = self
            .token_codec
            .encode(&claims)
            .await
            .map_err(|e| SessionError::Signing(e.to_string()))?;

        debug!(%user_id, %refresh_token_id, "session issued");

        Ok(Session {
            access_token,
            refresh_secret,
        })
    }

    async fn refresh_session(
        &self,
        presented: &Session,
        request_ip: &str,
    ) -> Result<Session, SessionError> {
        Self::validate_ip(request_ip)?;

        // Expired access tokens are fine here; the refresh record is the anchor.
        let claims = self
            .token_codec
            .decode(&presented.access_token, Freshness::Skip)
            .await
            .map_err(|e| Self::rejected(&e.to_string()))?;

        let record = match self.store.get_by_id(claims.refresh_token_id).await {
            Ok(record) => record,
            Err(StoreError::NotFound) => return Err(Self::rejected("refresh token not found")),
            Err(e) => return Err(Self::storage(e)),
        };

        if record.is_expired_at(Utc::now()) {
            return Err(Self::rejected("refresh token expired"));
        }

        if !self
            .secret_hasher
            .verify_secret(presented.refresh_secret.as_bytes(), &record.secret_hash)
            .await?
        {
            return Err(Self::rejected("refresh secret mismatch"));
        }

        // Everything above is advisory. Only the winner of the delete may rotate.
        match self
            .store
            .delete_by_id(record.id)
            .await
            .map_err(Self::storage)?
        {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::AlreadyGone => {
                warn!(
                    user_id = %claims.subject,
                    refresh_token_id = %record.id,
                    "refresh token consumed concurrently"
                );
                return Err(SessionError::Unauthorized);
            }
        }

        if !same_address(&claims.ip, request_ip) {
            info!(
                user_id = %claims.subject,
                previous_ip = %claims.ip,
                new_ip = %request_ip,
                "session refreshed from a new ip"
            );
            self.dispatcher.dispatch(
                claims.subject,
                NotificationContent::refresh_from_new_ip(&claims.ip, request_ip, Utc::now()),
            );
        }

        self.create_session(claims.subject, request_ip).await
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<AccessTokenClaims, SessionError> {
        self.token_codec
            .decode(token, Freshness::Enforce)
            .await
            .map_err(|e| {
                debug!(error = %e, "access token rejected");
                SessionError::Unauthorized
            })
    }
}
