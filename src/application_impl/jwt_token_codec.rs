use crate::application_port::{AccessToken, Freshness, TokenCodec, TokenError};
use crate::domain_model::{AccessTokenClaims, RefreshTokenId, UserId};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS512;

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: Uuid,
    sub_ip: String,
    exp: i64,
    refresh_token_id: Uuid,
}

/// HMAC-SHA512 JWS codec for access tokens.
pub struct JwtHs512Codec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtHs512Codec {
    pub fn new(signing_key: &[u8]) -> Self {
        JwtHs512Codec {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
        }
    }

    fn validation(freshness: Freshness) -> Validation {
        // Only HS512 is accepted, whatever the header claims.
        let mut v = Validation::new(SIGNING_ALGORITHM);
        v.leeway = 0;
        v.validate_exp = freshness == Freshness::Enforce;
        v.validate_aud = false;
        v.set_required_spec_claims(&["exp", "sub"]);
        v
    }

    fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => TokenError::AlgorithmMismatch,
            _ => TokenError::Malformed,
        }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs512Codec {
    async fn encode(&self, claims: &AccessTokenClaims) -> Result<AccessToken, TokenError> {
        let wire = AccessClaims {
            sub: claims.subject.0,
            sub_ip: claims.ip.clone(),
            exp: claims.expires_at.timestamp(),
            refresh_token_id: claims.refresh_token_id.0,
        };
        let token = encode(&Header::new(SIGNING_ALGORITHM), &wire, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(AccessToken(token))
    }

    async fn decode(
        &self,
        token: &AccessToken,
        freshness: Freshness,
    ) -> Result<AccessTokenClaims, TokenError> {
        let data = decode::<AccessClaims>(&token.0, &self.decoding_key, &Self::validation(freshness))
            .map_err(Self::classify)?;
        let claims = data.claims;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?;
        // The library only rejects exp < now; an access token is dead at exp.
        if freshness == Freshness::Enforce && expires_at <= Utc::now() {
            return Err(TokenError::Expired);
        }

        Ok(AccessTokenClaims {
            subject: UserId(claims.sub),
            ip: claims.sub_ip,
            expires_at,
            refresh_token_id: RefreshTokenId(claims.refresh_token_id),
        })
    }
}
