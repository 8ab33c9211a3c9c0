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
    } else if err.is_not_found() {
        ApiError::new(ApiErrorCode::NotFound)
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        ApiError::with_message(ApiErrorCode::ValidationError, format!("Validation error: {e}"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        ApiError::new(ApiErrorCode::PayloadTooLarge)
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        ApiError::with_message(ApiErrorCode::ValidationError, "Expected a JSON body")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiError::new(ApiErrorCode::MethodNotAllowed)
    } else {
        ApiError::internal(format!("unhandled rejection: {err:?}"))
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
    pub fn new(code: ApiErrorCode) -> Self {
        ApiError {
            message: code.to_string(),
            code,
        }
    }

    pub fn with_message(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        warn!("Internal error: {}", error);
        ApiError::new(ApiErrorCode::InternalError)
    }
}

impl reject::Reject for ApiError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Validation error")]
    ValidationError,
    #[error("User already exists")]
    UserExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Authentication required")]
    AuthenticationRequired,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Payload too large")]
    PayloadTooLarge,
    #[error("Internal server error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::ValidationError | ApiErrorCode::UserExists => StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::AuthenticationRequired
            | ApiErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::UserNotFound | ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Malformed => {
                ApiError::with_message(ApiErrorCode::ValidationError, "Token is malformed")
            }
            // not distinguished at the HTTP boundary
            TokenError::NotFound
            | TokenError::Revoked
            | TokenError::Expired
            | TokenError::InvalidSignature => ApiError::new(ApiErrorCode::InvalidToken),
            TokenError::StoreUnavailable(e) | TokenError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Validation(e) => {
                ApiError::with_message(ApiErrorCode::ValidationError, e.to_string())
            }
            AuthError::InvalidCredentials => ApiError::new(ApiErrorCode::InvalidCredentials),
            AuthError::UserExists => ApiError::new(ApiErrorCode::UserExists),
            AuthError::UserNotFound => ApiError::new(ApiErrorCode::UserNotFound),
            AuthError::Token(e) => ApiError::from(e),
            AuthError::Store(e) => ApiError::internal(e),
            AuthError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::Validation(e) => {
                ApiError::with_message(ApiErrorCode::ValidationError, e.to_string())
            }
            UserError::UserNotFound => ApiError::new(ApiErrorCode::UserNotFound),
            UserError::EmailTaken => {
                ApiError::with_message(ApiErrorCode::UserExists, "Email already taken")
            }
            UserError::Store(e) => ApiError::internal(e),
        }
    }
}
