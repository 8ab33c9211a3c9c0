use super::*;
use crate::domain_model::{UserId, UserProfile, ValidationError, normalize_email, strict_email};
use crate::domain_port::StoreError;
use serde::Serialize;
use std::fmt;
use validator::Validate;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AuthError::UserExists,
            StoreError::Unavailable(e) => AuthError::Store(e),
        }
    }
}

#[derive(Clone, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, message = "Username should be at least 3 characters"))]
    pub username: String,
    #[validate(
        email(message = "email is not a valid address"),
        custom(function = "strict_email")
    )]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 18,
        message = "Password must be between 6 and 18 characters long"
    ))]
    pub password: String,
}

impl RegisterInput {
    /// Trims username and email, lowercases email, then applies the rules.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let input = RegisterInput {
            username: self.username.trim().to_owned(),
            email: normalize_email(&self.email),
            password: self.password,
        };
        input.validate()?;
        Ok(input)
    }
}

impl fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterInput")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Validate)]
pub struct LoginInput {
    #[validate(
        email(message = "email is not a valid address"),
        custom(function = "strict_email")
    )]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 18,
        message = "Password must be between 6 and 18 characters long"
    ))]
    pub password: String,
}

impl LoginInput {
    pub fn validated(self) -> Result<Self, ValidationError> {
        let input = LoginInput {
            email: normalize_email(&self.email),
            password: self.password,
        };
        input.validate()?;
        Ok(input)
    }
}

impl fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInput")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<AuthResult, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<AuthResult, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError>;
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;
    async fn authenticate(&self, access_token: &str) -> Result<UserId, AuthError>;
}
