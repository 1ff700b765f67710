use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub session: Session,
    pub hasher: Hasher,
    pub store: Store,
    pub reaper: Reaper,
    pub notification: Notification,
    pub http: Http,
    pub log: Log,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub signing_key: SigningKey,
}

/// HMAC key for access tokens. Never printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(***)")
    }
}

#[derive(Debug, Deserialize)]
pub struct Hasher {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory", "mysql" or "redis"
    #[serde(default)]
    pub mysql_dsn: Option<String>,
    #[serde(default)]
    pub redis_dsn: Option<String>,
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_redis_prefix() -> String {
    "refresh_token".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Reaper {
    #[serde(default = "default_reaper_period_secs")]
    pub period_secs: u64,
}

fn default_reaper_period_secs() -> u64 {
    crate::server::DEFAULT_REAPER_PERIOD.as_secs()
}

#[derive(Debug, Deserialize)]
pub struct Notification {
    pub backend: String, // "log" or "outbox"
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides use this prefix, e.g. `CADENCE__SESSION__SIGNING_KEY`.
const ENV_PREFIX: &str = "CADENCE";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_dev_settings() {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        assert_eq!(settings.store.backend, "memory");
        assert_eq!(settings.reaper.period_secs, 300);
        assert!(!settings.session.signing_key.is_empty());
    }

    #[test]
    fn signing_key_is_redacted() {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        let printed = format!("{settings:?}");
        assert!(printed.contains("SigningKey(***)"));
        assert!(!printed.contains("dev-only-signing-key"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("settings/does-not-exist.toml")).is_err());
    }
}
