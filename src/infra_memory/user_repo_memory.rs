use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Users keyed by id, plus an email index that enforces uniqueness.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<UserId, UserRecord>,
    by_email: DashMap<String, UserId>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `email` for `user_id`. Returns `false` if another user owns it.
    fn claim_email(&self, email: &str, user_id: UserId) -> bool {
        let owner = *self.by_email.entry(email.to_owned()).or_insert(user_id);
        owner == user_id
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, user: &UserRecord) -> Result<(), StoreError> {
        if !self.claim_email(&user.email, user.user_id) {
            return Err(StoreError::Conflict);
        }
        self.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let Some(user_id) = self.by_email.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.get_by_id(user_id).await
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        username: &str,
        email: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(current_email) = self.users.get(&user_id).map(|u| u.email.clone()) else {
            return Ok(false);
        };

        if current_email != email {
            if !self.claim_email(email, user_id) {
                return Err(StoreError::Conflict);
            }
            self.by_email.remove(&current_email);
        }

        match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.username = username.to_owned();
                user.email = email.to_owned();
                user.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, user_id: UserId) -> Result<bool, StoreError> {
        match self.users.remove(&user_id) {
            Some((_, user)) => {
                self.by_email.remove(&user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            user_id: UserId::new_random(),
            username: "someone".into(),
            email: email.into(),
            password_hash: "x".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn email_is_unique() {
        let repo = MemoryUserRepo::new();
        repo.create(&user("a@x.io")).await.unwrap();
        assert!(matches!(
            repo.create(&user("a@x.io")).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn update_moves_email_index() {
        let repo = MemoryUserRepo::new();
        let a = user("a@x.io");
        let b = user("b@x.io");
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();

        assert!(matches!(
            repo.update_profile(a.user_id, "renamed", "b@x.io", Utc::now()).await,
            Err(StoreError::Conflict)
        ));

        assert!(repo
            .update_profile(a.user_id, "renamed", "c@x.io", Utc::now())
            .await
            .unwrap());
        assert!(repo.get_by_email("a@x.io").await.unwrap().is_none());
        let moved = repo.get_by_email("c@x.io").await.unwrap().unwrap();
        assert_eq!(moved.username, "renamed");

        // the old address is free again
        repo.create(&user("a@x.io")).await.unwrap();
    }

    #[tokio::test]
    async fn delete_frees_email() {
        let repo = MemoryUserRepo::new();
        let a = user("a@x.io");
        repo.create(&a).await.unwrap();
        assert!(repo.delete(a.user_id).await.unwrap());
        assert!(!repo.delete(a.user_id).await.unwrap());
        assert!(repo.get_by_id(a.user_id).await.unwrap().is_none());
        repo.create(&user("a@x.io")).await.unwrap();
    }
}
