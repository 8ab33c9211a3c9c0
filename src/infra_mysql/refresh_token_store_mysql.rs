use super::util::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlRefreshTokenStore {
    pool: MySqlPool,
}

impl MySqlRefreshTokenStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRefreshTokenStore { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<RefreshTokenRecord, StoreError> {
        let user_id_bytes: Vec<u8> = row.try_get("user_id").map_err(store_err)?;

        Ok(RefreshTokenRecord {
            token_hash: row.try_get("token_hash").map_err(store_err)?,
            user_id: uid_from_bytes(&user_id_bytes)?,
            issued_at: row.try_get("issued_at").map_err(store_err)?,
            expires_at: row.try_get("expires_at").map_err(store_err)?,
            revoked_at: row.try_get("revoked_at").map_err(store_err)?,
        })
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for MySqlRefreshTokenStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
INSERT INTO refresh_token (token_hash, user_id, issued_at, expires_at, revoked_at)
VALUES (?, ?, ?, ?, ?)
"#,
        )
        .bind(&record.token_hash)
        .bind(uid_as_bytes(&record.user_id))
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT token_hash, user_id, issued_at, expires_at, revoked_at
FROM refresh_token
WHERE token_hash = ?
"#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn mark_revoked(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
UPDATE refresh_token
SET revoked_at = ?
WHERE token_hash = ? AND revoked_at IS NULL
"#,
        )
        .bind(revoked_at)
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE expires_at < ?")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(result.rows_affected())
    }
}
