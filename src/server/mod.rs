mod purge;
mod server;

pub use purge::*;
pub use server::*;
