use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::SubsecRound;
use std::sync::Arc;

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_lifecycle: Arc<dyn TokenLifecycle>,
    clock: Arc<dyn Clock>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_lifecycle: Arc<dyn TokenLifecycle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_lifecycle,
            clock,
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<AuthResult, AuthError> {
        let request = request.validated()?;

        if self.user_repo.get_by_email(&request.email).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let password_hash = self
            .credential_hasher
            .hash_password(&request.password)
            .await?;
        let now = self.clock.now().trunc_subsecs(6);
        let user = UserRecord {
            user_id: UserId::new_random(),
            username: request.username,
            email: request.email,
            password_hash,
            created_at: now,
            updated_at: now,
        };
        // a concurrent registration may still win the race; the store reports Conflict
        self.user_repo.create(&user).await?;
        info!(user = %user.user_id, "registered user");

        let tokens = self.token_lifecycle.issue(user.user_id).await?;
        Ok(AuthResult {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    async fn login(&self, request: LoginInput) -> Result<AuthResult, AuthError> {
        let request = request.validated()?;

        let user = self
            .user_repo
            .get_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&request.password, &user.password_hash)
            .await?;
        if !ok {
            debug!(user = %user.user_id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.token_lifecycle.issue(user.user_id).await?;
        Ok(AuthResult {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError> {
        let (user_id, grant) = self.token_lifecycle.refresh(refresh_token).await?;

        if self.user_repo.get_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }
        Ok(grant)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.token_lifecycle.revoke(refresh_token).await?;
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<UserId, AuthError> {
        Ok(self.token_lifecycle.verify_access(access_token).await?)
    }
}
