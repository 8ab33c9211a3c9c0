use super::error::*;
use super::handler;
use crate::application_port::AuthService;
use crate::domain_model::UserId;
use crate::server::*;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let register = warp::path("register")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::path("refresh")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path("logout")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let get_me = warp::path("me")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::get_me);

    let update_me = warp::path("me")
        .and(warp::path::end())
        .and(warp::patch())
        .and(with_verification(server.auth_service.clone()))
        .and(json_body())
        .and(with(server.user_service.clone()))
        .and_then(handler::update_me);

    let delete_me = warp::path("me")
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::delete_me);

    register
        .or(login)
        .or(refresh)
        .or(logout)
        .or(get_me)
        .or(update_me)
        .or(delete_me)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(
        move |header: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let header = header
                    .ok_or_else(|| reject::custom(ApiError::new(ApiErrorCode::AuthenticationRequired)))?;
                let token = header
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| reject::custom(ApiError::new(ApiErrorCode::InvalidToken)))?;
                // every verification failure is the same 401 to the caller
                auth_service
                    .authenticate(token.trim())
                    .await
                    .map_err(|_| reject::custom(ApiError::new(ApiErrorCode::InvalidToken)))
            }
        },
    )
}
