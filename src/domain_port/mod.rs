mod clock;
mod error;

pub use clock::*;
pub use error::*;

// repo

mod refresh_token_store;
mod user_repo;

pub use refresh_token_store::*;
pub use user_repo::*;
