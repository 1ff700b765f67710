use super::{RefreshTokenId, UserId};
use chrono::{DateTime, Utc};

/// Decoded payload of an access token.
///
/// Built once at issuance and never mutated; `refresh_token_id` pins the
/// token to the record created alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenClaims {
    pub subject: UserId,
    pub ip: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_token_id: RefreshTokenId,
}
