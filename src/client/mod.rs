//! Client-side helpers for services that call the auth API.

mod coalescer;
mod http_refresher;

pub use coalescer::*;
pub use http_refresher::*;
