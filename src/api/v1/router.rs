use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::domain_model::AccessTokenClaims;
use nanoid::nanoid;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    session_service: Arc<dyn SessionService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let create_session = warp::post()
        .and(warp::path("sessions"))
        .and(warp::path::end())
        .and(warp::query::<handler::CreateSessionQuery>())
        .and(with_client_ip())
        .and(with(session_service.clone()))
        .and_then(handler::create_session);

    let refresh_session = warp::post()
        .and(warp::path("sessions"))
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::json())
        .and(with_client_ip())
        .and(with(session_service.clone()))
        .and_then(handler::refresh_session);

    let current_session = warp::get()
        .and(warp::path("sessions"))
        .and(warp::path("current"))
        .and(warp::path::end())
        .and(with_verification(session_service))
        .and_then(handler::current_session);

    create_session
        .or(refresh_session)
        .or(current_session)
        .with(warp::trace(|info| {
            let request_id = nanoid!(12);
            tracing::info_span!(
                "request",
                method = %info.method(),
                path = %info.path(),
                %request_id,
            )
        }))
}

/// Routes with rejections already rendered as JSON error responses.
pub fn routes_with_recovery(
    session_service: Arc<dyn SessionService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    routes(session_service).recover(recover_error)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_client_ip() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::addr::remote().and_then(|addr: Option<SocketAddr>| async move {
        addr.map(|addr| addr.ip().to_string())
            .ok_or_else(|| reject::custom(ApiError::bad_request("client address unavailable")))
    })
}

fn with_verification(
    session_service: Arc<dyn SessionService>,
) -> impl Filter<Extract = (AccessTokenClaims,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let session_service = session_service.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                let claims = session_service
                    .verify_access_token(&AccessToken(token.to_string()))
                    .await
                    .map_err(ApiError::from)
                    .map_err(reject::custom)?;
                Ok(claims)
            } else {
                Err(reject::custom(ApiError::new(
                    ApiErrorCode::Unauthorized,
                    ApiErrorCode::Unauthorized.to_string(),
                )))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::v1::SessionBody;
    use crate::application_impl::*;
    use crate::domain_model::*;
    use crate::infra_memory::MemoryRefreshTokenStore;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::time::Duration;
    use warp::http::StatusCode;

    struct Quiet;

    impl NotificationDispatcher for Quiet {
        fn dispatch(&self, _: UserId, _: NotificationContent) {}
    }

    fn service() -> Arc<dyn SessionService> {
        Arc::new(RealSessionService::new(
            Arc::new(MemoryRefreshTokenStore::new()),
            Arc::new(Argon2SecretHasher::with_cost(8, 1, 1).unwrap()),
            Arc::new(JwtHs512Codec::new(b"router-test-key")),
            Arc::new(Quiet),
            SessionConfig {
                access_ttl: Duration::from_secs(60),
                refresh_ttl: Duration::from_secs(600),
            },
        ))
    }

    fn peer(ip: &str) -> SocketAddr {
        SocketAddr::new(ip.parse().unwrap(), 40000)
    }

    async fn issue(session_service: &Arc<dyn SessionService>, user_id: &str) -> SessionBody {
        let res = warp::test::request()
            .method("POST")
            .path(&format!("/sessions?userID={user_id}"))
            .remote_addr(peer("10.0.0.1"))
            .reply(&routes_with_recovery(session_service.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        serde_json::from_slice(res.body()).unwrap()
    }

    #[tokio::test]
    async fn create_returns_created_pair() {
        let body = issue(&service(), "6b0f6e3c-2f4a-4a53-9a53-3e2a1f1d7c10").await;

        assert_eq!(body.access_token.split('.').count(), 3);
        assert_eq!(STANDARD.decode(&body.refresh_token).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn create_rejects_bad_user_id() {
        let api = routes_with_recovery(service());

        for path in ["/sessions?userID=not-a-uuid", "/sessions"] {
            let res = warp::test::request()
                .method("POST")
                .path(path)
                .remote_addr(peer("10.0.0.1"))
                .reply(&api)
                .await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
        }
    }

    #[tokio::test]
    async fn refresh_rotates_pair_and_rejects_replay() {
        let service = service();
        let api = routes_with_recovery(service.clone());
        let first = issue(&service, "6b0f6e3c-2f4a-4a53-9a53-3e2a1f1d7c10").await;

        let res = warp::test::request()
            .method("POST")
            .path("/sessions/refresh")
            .remote_addr(peer("10.0.0.2"))
            .json(&first)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let second: SessionBody = serde_json::from_slice(res.body()).unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);

        let replay = warp::test::request()
            .method("POST")
            .path("/sessions/refresh")
            .remote_addr(peer("10.0.0.1"))
            .json(&first)
            .reply(&api)
            .await;
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_rejects_bad_encoding_and_bad_body() {
        let service = service();
        let api = routes_with_recovery(service.clone());
        let first = issue(&service, "6b0f6e3c-2f4a-4a53-9a53-3e2a1f1d7c10").await;

        let bad_base64 = SessionBody {
            access_token: first.access_token.clone(),
            refresh_token: "%%% not base64 %%%".to_string(),
        };
        let res = warp::test::request()
            .method("POST")
            .path("/sessions/refresh")
            .remote_addr(peer("10.0.0.1"))
            .json(&bad_base64)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = warp::test::request()
            .method("POST")
            .path("/sessions/refresh")
            .remote_addr(peer("10.0.0.1"))
            .header("content-type", "application/json")
            .body("{\"access_token\": 7}")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refresh_rejects_wrong_secret() {
        let service = service();
        let api = routes_with_recovery(service.clone());
        let first = issue(&service, "6b0f6e3c-2f4a-4a53-9a53-3e2a1f1d7c10").await;

        let tampered = SessionBody {
            access_token: first.access_token.clone(),
            refresh_token: STANDARD.encode([7u8; 32]),
        };
        let res = warp::test::request()
            .method("POST")
            .path("/sessions/refresh")
            .remote_addr(peer("10.0.0.1"))
            .json(&tampered)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        // The genuine pair still works afterwards.
        let res = warp::test::request()
            .method("POST")
            .path("/sessions/refresh")
            .remote_addr(peer("10.0.0.1"))
            .json(&first)
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn current_session_requires_valid_bearer() {
        let service = service();
        let api = routes_with_recovery(service.clone());
        let user_id = "6b0f6e3c-2f4a-4a53-9a53-3e2a1f1d7c10";
        let issued = issue(&service, user_id).await;

        let res = warp::test::request()
            .method("GET")
            .path("/sessions/current")
            .header("authorization", format!("Bearer {}", issued.access_token))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["user_id"], user_id);
        assert_eq!(body["ip"], "10.0.0.1");

        let res = warp::test::request()
            .method("GET")
            .path("/sessions/current")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = warp::test::request()
            .method("GET")
            .path("/sessions/current")
            .header("authorization", "Bearer not.a.token")
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
