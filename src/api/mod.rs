pub mod v1;

use crate::server::Server;
use std::sync::Arc;
use warp::Filter;

/// All auth routes under `/api/auth`. Callers attach `v1::recover_error`.
pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("auth"))
        .and(v1::routes(server))
}

pub use v1::recover_error;
