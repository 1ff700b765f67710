use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let error = if let Some(err) = err.find::<ApiError>() {
        err.clone()
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        ApiError::bad_request(e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        ApiError::bad_request(e.to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some()
        || err.find::<warp::reject::PayloadTooLarge>().is_some()
    {
        ApiError::bad_request("request body missing or too large")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        ApiError::bad_request("expected a JSON body")
    } else if err.find::<warp::reject::MissingHeader>().is_some() {
        ApiError::new(ApiErrorCode::Unauthorized, ApiErrorCode::Unauthorized.to_string())
    } else if err.is_not_found() {
        ApiError::new(ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiError::new(
            ApiErrorCode::MethodNotAllowed,
            ApiErrorCode::MethodNotAllowed.to_string(),
        )
    } else {
        warn!("Unhandled rejection: {:?}", err);
        ApiError::new(ApiErrorCode::InternalError, ApiErrorCode::InternalError.to_string())
    };

    let status = error.code.status();
    Ok(warp::reply::with_status(warp::reply::json(&error), status))
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }
}

impl reject::Reject for ApiError {}

#[derive(Debug, Clone, Copy, Error, Serialize, PartialEq, Eq)]
pub enum ApiErrorCode {
    #[error("Malformed request")]
    BadRequest,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Validation(message) => ApiError::bad_request(message),
            SessionError::Unauthorized => ApiError::new(
                ApiErrorCode::Unauthorized,
                ApiErrorCode::Unauthorized.to_string(),
            ),
            other => {
                let code = ApiErrorCode::internal(other);
                ApiError::new(code, code.to_string())
            }
        }
    }
}
