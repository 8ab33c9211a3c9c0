use super::StoreError;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `StoreError::Conflict` when the email is taken.
    async fn create(&self, user: &UserRecord) -> Result<(), StoreError>;

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Returns `false` when no such user exists.
    async fn update_profile(
        &self,
        user_id: UserId,
        username: &str,
        email: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Returns `false` when no such user exists.
    async fn delete(&self, user_id: UserId) -> Result<bool, StoreError>;
}
