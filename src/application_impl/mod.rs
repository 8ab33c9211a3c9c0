mod auth_service_impl;
mod jwt_codec;
mod password_hasher;
mod token_lifecycle_impl;
mod user_service_impl;

pub use auth_service_impl::*;
pub use jwt_codec::*;
pub use password_hasher::*;
pub use token_lifecycle_impl::*;
pub use user_service_impl::*;
