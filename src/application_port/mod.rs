mod auth_service;
mod token_lifecycle;
mod user_service;

pub use auth_service::*;
pub use token_lifecycle::*;
pub use user_service::*;
