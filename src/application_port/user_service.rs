use crate::domain_model::{UserId, UserProfile, ValidationError, normalize_email, strict_email};
use crate::domain_port::StoreError;
use validator::Validate;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("user not found")]
    UserNotFound,
    #[error("email already taken")]
    EmailTaken,
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for UserError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => UserError::EmailTaken,
            StoreError::Unavailable(e) => UserError::Store(e),
        }
    }
}

#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 3, message = "Username should be at least 3 characters"))]
    pub username: Option<String>,
    #[validate(
        email(message = "email is not a valid address"),
        custom(function = "strict_email")
    )]
    pub email: Option<String>,
}

impl UpdateProfileInput {
    /// Same normalization and rules as registration, for the fields present.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let input = UpdateProfileInput {
            username: self.username.map(|u| u.trim().to_owned()),
            email: self.email.as_deref().map(normalize_email),
        };
        input.validate()?;
        Ok(input)
    }
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Result<UserProfile, UserError>;
    async fn update_profile(
        &self,
        user_id: UserId,
        input: UpdateProfileInput,
    ) -> Result<UserProfile, UserError>;
    async fn delete_account(&self, user_id: UserId) -> Result<(), UserError>;
}
