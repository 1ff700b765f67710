use crate::application_port::{SecretHasher, SessionError};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Argon2id hashing of refresh secrets.
///
/// Every hash gets its own random salt and is stored as a PHC string, so the
/// parameters travel with the hash and can be raised without invalidating
/// existing records. Hashing runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct Argon2SecretHasher {
    params: Params,
}

impl Default for Argon2SecretHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl Argon2SecretHasher {
    pub fn new(params: Params) -> Self {
        Argon2SecretHasher { params }
    }

    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> anyhow::Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        Ok(Self::new(params))
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }
}

#[async_trait::async_trait]
impl SecretHasher for Argon2SecretHasher {
    async fn hash_secret(&self, secret: &[u8]) -> Result<String, SessionError> {
        let secret = secret.to_vec();
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Self::argon2(params)
                .hash_password(&secret, &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| SessionError::Internal(format!("hash error: {e}")))
        })
        .await
        .map_err(|e| SessionError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn verify_secret(&self, secret: &[u8], secret_hash: &str) -> Result<bool, SessionError> {
        let secret = secret.to_vec();
        let secret_hash = secret_hash.to_owned();
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&secret_hash)
                .map_err(|e| SessionError::Internal(format!("invalid PHC hash: {e}")))?;

            match Self::argon2(params).verify_password(&secret, &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(SessionError::Internal(format!("verify error: {e}"))),
            }
        })
        .await
        .map_err(|e| SessionError::Internal(format!("hashing task failed: {e}")))?
    }
}
