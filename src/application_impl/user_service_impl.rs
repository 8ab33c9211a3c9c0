use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::SubsecRound;
use std::sync::Arc;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    clock: Arc<dyn Clock>,
}

impl RealUserService {
    pub fn new(user_repo: Arc<dyn UserRepo>, clock: Arc<dyn Clock>) -> Self {
        Self { user_repo, clock }
    }

    async fn load(&self, user_id: UserId) -> Result<UserRecord, UserError> {
        self.user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(UserError::UserNotFound)
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn get_profile(&self, user_id: UserId) -> Result<UserProfile, UserError> {
        let user = self.load(user_id).await?;
        Ok(UserProfile::from(&user))
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        input: UpdateProfileInput,
    ) -> Result<UserProfile, UserError> {
        let input = input.validated()?;

        let current = self.load(user_id).await?;
        let username = input.username.unwrap_or(current.username);
        let email = input.email.unwrap_or(current.email);
        let updated_at = self.clock.now().trunc_subsecs(6);

        if !self
            .user_repo
            .update_profile(user_id, &username, &email, updated_at)
            .await?
        {
            return Err(UserError::UserNotFound);
        }
        debug!(user = %user_id, "updated profile");

        self.get_profile(user_id).await
    }

    async fn delete_account(&self, user_id: UserId) -> Result<(), UserError> {
        if !self.user_repo.delete(user_id).await? {
            return Err(UserError::UserNotFound);
        }
        info!(user = %user_id, "deleted account");
        Ok(())
    }
}
