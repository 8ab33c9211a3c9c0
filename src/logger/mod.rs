//! Global tracing setup. Bootstraps at `info` (or `RUST_LOG`), then reloads
//! the filter from `[log] filter` once settings are parsed.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
