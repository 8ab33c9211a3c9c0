use super::StoreError;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Insert a new row. `token_hash` is the unique key.
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError>;

    async fn find_by_hash(&self, token_hash: &str)
    -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Stamp `revoked_at` only if the row is not revoked yet.
    /// Returns `true` when this call performed the stamp.
    async fn mark_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Delete rows whose `expires_at` is strictly before `before`.
    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;
}
