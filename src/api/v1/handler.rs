use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

/// Wire form of a session. `refresh_token` is the raw secret in standard base64.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionBody {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<Session> for SessionBody {
    fn from(session: Session) -> Self {
        SessionBody {
            access_token: session.access_token.0,
            refresh_token: STANDARD.encode(session.refresh_secret.as_bytes()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionQuery {
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
}

pub async fn create_session(
    query: CreateSessionQuery,
    client_ip: String,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = query
        .user_id
        .as_deref()
        .ok_or_else(|| reject::custom(ApiError::bad_request("missing userID")))?
        .parse::<UserId>()
        .map_err(|e| reject::custom(ApiError::bad_request(format!("parse userID: {e}"))))?;

    let session = session_service
        .create_session(user_id, &client_ip)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&SessionBody::from(session)),
        StatusCode::CREATED,
    ))
}

pub async fn refresh_session(
    body: SessionBody,
    client_ip: String,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let refresh_secret = STANDARD.decode(body.refresh_token.as_bytes()).map_err(|e| {
        reject::custom(ApiError::bad_request(format!(
            "decode base64 refresh token: {e}"
        )))
    })?;

    let presented = Session {
        access_token: AccessToken(body.access_token),
        refresh_secret: RefreshSecret(refresh_secret),
    };
    let session = session_service
        .refresh_session(&presented, &client_ip)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&SessionBody::from(session)),
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Serialize)]
pub struct CurrentSessionResponse {
    pub user_id: UserId,
    pub ip: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_token_id: RefreshTokenId,
}

pub async fn current_session(
    claims: AccessTokenClaims,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = CurrentSessionResponse {
        user_id: claims.subject,
        ip: claims.ip,
        expires_at: claims.expires_at,
        refresh_token_id: claims.refresh_token_id,
    };
    Ok(warp::reply::json(&response))
}
