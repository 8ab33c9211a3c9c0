use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{Duration, SubsecRound};
use sha2::{Digest, Sha256};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(30),
        }
    }
}

/// SHA-256 hex digest used as the refresh token's storage key.
pub fn hash_refresh_token(token: &RefreshToken) -> String {
    hex::encode(Sha256::digest(token.0.as_bytes()))
}

pub struct RealTokenLifecycle {
    store: Arc<dyn RefreshTokenStore>,
    codec: Arc<dyn TokenCodec>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
}

impl RealTokenLifecycle {
    pub fn new(
        store: Arc<dyn RefreshTokenStore>,
        codec: Arc<dyn TokenCodec>,
        clock: Arc<dyn Clock>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            store,
            codec,
            clock,
            policy,
        }
    }

    #[inline]
    fn new_refresh_token() -> RefreshToken {
        let mut bytes = [0u8; REFRESH_TOKEN_LEN / 2];
        OsRng.fill_bytes(&mut bytes);
        RefreshToken(hex::encode(bytes))
    }

    fn mint_access(&self, user: UserId) -> Result<AccessGrant, TokenError> {
        let now = self.clock.now();
        // JWT timestamps have second resolution
        let expires_at = (now + self.policy.access_ttl).trunc_subsecs(0);
        let access_token = self.codec.sign_access(user, now, expires_at)?;
        Ok(AccessGrant {
            access_token,
            access_token_expires_at: expires_at,
        })
    }

    async fn find_record(&self, token: &RefreshToken) -> Result<RefreshTokenRecord, TokenError> {
        self.store
            .find_by_hash(&hash_refresh_token(token))
            .await?
            .ok_or(TokenError::NotFound)
    }
}

#[async_trait::async_trait]
impl TokenLifecycle for RealTokenLifecycle {
    async fn issue(&self, user: UserId) -> Result<TokenPair, TokenError> {
        let grant = self.mint_access(user)?;

        // microsecond precision survives a DATETIME(6) round trip
        let now = self.clock.now().trunc_subsecs(6);
        let refresh_token = Self::new_refresh_token();
        let record = RefreshTokenRecord {
            token_hash: hash_refresh_token(&refresh_token),
            user_id: user,
            issued_at: now,
            expires_at: now + self.policy.refresh_ttl,
            revoked_at: None,
        };
        self.store.insert(&record).await?;

        info!(%user, expires_at = %record.expires_at, "issued token pair");
        Ok(TokenPair {
            access_token: grant.access_token,
            access_token_expires_at: grant.access_token_expires_at,
            refresh_token,
            refresh_token_expires_at: record.expires_at,
        })
    }

    async fn verify_access(&self, access_token: &str) -> Result<UserId, TokenError> {
        if access_token.is_empty() {
            return Err(TokenError::Malformed);
        }
        let signed = self
            .codec
            .decode_access(&AccessToken(access_token.to_owned()))?;

        if self.clock.now() > signed.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(signed.user_id)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<(UserId, AccessGrant), TokenError> {
        let token = RefreshToken::parse(refresh_token)?;
        let record = self.find_record(&token).await?;

        match record.state_at(self.clock.now()) {
            RefreshTokenState::Active => {}
            RefreshTokenState::Revoked => return Err(TokenError::Revoked),
            RefreshTokenState::Expired => return Err(TokenError::Expired),
        }

        let grant = self.mint_access(record.user_id)?;
        debug!(user = %record.user_id, "refreshed access token");
        Ok((record.user_id, grant))
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), TokenError> {
        let token = RefreshToken::parse(refresh_token)?;
        let record = self.find_record(&token).await?;

        if record.revoked_at.is_some() {
            debug!(user = %record.user_id, "refresh token already revoked");
            return Ok(());
        }

        let stamped = self
            .store
            .mark_revoked(&record.token_hash, self.clock.now().trunc_subsecs(6))
            .await?;
        if stamped {
            info!(user = %record.user_id, "revoked refresh token");
        } else {
            debug!(user = %record.user_id, "refresh token revoked concurrently");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{JwtConfig, JwtHs256Codec};
    use crate::infra_memory::MemoryRefreshTokenStore;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        lifecycle: RealTokenLifecycle,
        store: Arc<MemoryRefreshTokenStore>,
        clock: Arc<ManualClock>,
    }

    fn codec() -> Arc<dyn TokenCodec> {
        Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: "tollgate.test".into(),
            audience: "tests".into(),
            signing_key: b"lifecycle-test-key".to_vec(),
        }))
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryRefreshTokenStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let lifecycle = RealTokenLifecycle::new(
            store.clone(),
            codec(),
            clock.clone(),
            TokenPolicy::default(),
        );
        Fixture {
            lifecycle,
            store,
            clock,
        }
    }

    async fn stored(f: &Fixture, pair: &TokenPair) -> RefreshTokenRecord {
        f.store
            .find_by_hash(&hash_refresh_token(&pair.refresh_token))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn issue_then_verify_returns_principal() {
        let f = fixture();
        let user = UserId::new_random();
        let pair = f.lifecycle.issue(user).await.unwrap();

        assert_eq!(
            f.lifecycle.verify_access(&pair.access_token.0).await.unwrap(),
            user
        );
        assert_eq!(pair.refresh_token.0.len(), REFRESH_TOKEN_LEN);
        assert!(RefreshToken::parse(&pair.refresh_token.0).is_ok());

        let rec = stored(&f, &pair).await;
        assert_eq!(rec.user_id, user);
        assert_eq!(rec.expires_at - rec.issued_at, Duration::days(30));
        assert!(rec.revoked_at.is_none());
        assert_ne!(rec.token_hash, pair.refresh_token.0);
    }

    #[tokio::test]
    async fn each_issue_creates_a_distinct_session() {
        let f = fixture();
        let user = UserId::new_random();
        let a = f.lifecycle.issue(user).await.unwrap();
        let b = f.lifecycle.issue(user).await.unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
        assert_eq!(f.store.len(), 2);
    }

    #[tokio::test]
    async fn access_token_expires_after_fifteen_minutes() {
        let f = fixture();
        let pair = f.lifecycle.issue(UserId::new_random()).await.unwrap();

        f.clock.advance(Duration::minutes(14));
        assert!(f.lifecycle.verify_access(&pair.access_token.0).await.is_ok());

        f.clock.advance(Duration::minutes(2));
        assert!(matches!(
            f.lifecycle.verify_access(&pair.access_token.0).await,
            Err(TokenError::Expired)
        ));
    }

    #[tokio::test]
    async fn tampered_access_token_fails_signature() {
        let f = fixture();
        let pair = f.lifecycle.issue(UserId::new_random()).await.unwrap();
        let mut parts: Vec<String> = pair.access_token.0.split('.').map(String::from).collect();
        let sig = parts[2].clone();
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        parts[2] = format!("{flipped}{}", &sig[1..]);

        assert!(matches!(
            f.lifecycle.verify_access(&parts.join(".")).await,
            Err(TokenError::InvalidSignature)
        ));
        assert!(matches!(
            f.lifecycle.verify_access("").await,
            Err(TokenError::Malformed)
        ));
    }

    #[tokio::test]
    async fn full_session_scenario() {
        let f = fixture();
        let user = UserId::new_random();
        let pair = f.lifecycle.issue(user).await.unwrap();

        f.clock.advance(Duration::minutes(16));
        assert!(matches!(
            f.lifecycle.verify_access(&pair.access_token.0).await,
            Err(TokenError::Expired)
        ));

        let (principal, grant) = f.lifecycle.refresh(&pair.refresh_token.0).await.unwrap();
        assert_eq!(principal, user);
        assert_eq!(
            f.lifecycle.verify_access(&grant.access_token.0).await.unwrap(),
            user
        );

        f.lifecycle.revoke(&pair.refresh_token.0).await.unwrap();
        assert!(matches!(
            f.lifecycle.refresh(&pair.refresh_token.0).await,
            Err(TokenError::Revoked)
        ));
    }

    #[tokio::test]
    async fn refresh_never_touches_the_row() {
        let f = fixture();
        let user = UserId::new_random();
        let pair = f.lifecycle.issue(user).await.unwrap();
        let before = stored(&f, &pair).await;

        let mut tokens = Vec::new();
        for _ in 0..5 {
            f.clock.advance(Duration::seconds(1));
            let (_, grant) = f.lifecycle.refresh(&pair.refresh_token.0).await.unwrap();
            tokens.push(grant.access_token.0);
        }
        for token in &tokens {
            assert_eq!(f.lifecycle.verify_access(token).await.unwrap(), user);
        }
        tokens.dedup();
        assert_eq!(tokens.len(), 5);
        assert_eq!(stored(&f, &pair).await, before);
    }

    #[tokio::test]
    async fn refresh_expiry_boundary() {
        let f = fixture();
        let pair = f.lifecycle.issue(UserId::new_random()).await.unwrap();
        let rec = stored(&f, &pair).await;

        f.clock.set(rec.expires_at);
        assert!(f.lifecycle.refresh(&pair.refresh_token.0).await.is_ok());

        f.clock.set(rec.expires_at + Duration::seconds(1));
        assert!(matches!(
            f.lifecycle.refresh(&pair.refresh_token.0).await,
            Err(TokenError::Expired)
        ));
    }

    #[tokio::test]
    async fn unknown_refresh_token_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.lifecycle.refresh(&"0".repeat(REFRESH_TOKEN_LEN)).await,
            Err(TokenError::NotFound)
        ));
        assert!(matches!(
            f.lifecycle.revoke(&"0".repeat(REFRESH_TOKEN_LEN)).await,
            Err(TokenError::NotFound)
        ));
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_keeps_first_timestamp() {
        let f = fixture();
        let pair = f.lifecycle.issue(UserId::new_random()).await.unwrap();

        f.lifecycle.revoke(&pair.refresh_token.0).await.unwrap();
        let first = stored(&f, &pair).await.revoked_at.unwrap();

        f.clock.advance(Duration::hours(1));
        f.lifecycle.revoke(&pair.refresh_token.0).await.unwrap();
        assert_eq!(stored(&f, &pair).await.revoked_at, Some(first));
    }

    #[tokio::test]
    async fn revoked_wins_over_expired() {
        let f = fixture();
        let pair = f.lifecycle.issue(UserId::new_random()).await.unwrap();
        f.lifecycle.revoke(&pair.refresh_token.0).await.unwrap();
        f.clock.advance(Duration::days(31));
        assert!(matches!(
            f.lifecycle.refresh(&pair.refresh_token.0).await,
            Err(TokenError::Revoked)
        ));
    }

    #[tokio::test]
    async fn concurrent_refreshes_both_succeed() {
        let f = fixture();
        let user = UserId::new_random();
        let pair = f.lifecycle.issue(user).await.unwrap();
        let before = stored(&f, &pair).await;

        let (a, b) = tokio::join!(
            f.lifecycle.refresh(&pair.refresh_token.0),
            f.lifecycle.refresh(&pair.refresh_token.0)
        );
        assert_eq!(a.unwrap().0, user);
        assert_eq!(b.unwrap().0, user);
        assert_eq!(stored(&f, &pair).await, before);
    }

    #[tokio::test]
    async fn revoking_an_expired_token_stamps_it() {
        let f = fixture();
        let pair = f.lifecycle.issue(UserId::new_random()).await.unwrap();
        let rec = stored(&f, &pair).await;

        f.clock.set(rec.expires_at + Duration::days(1));
        f.lifecycle.revoke(&pair.refresh_token.0).await.unwrap();

        let after = stored(&f, &pair).await;
        assert_eq!(after.revoked_at, Some(f.clock.now().trunc_subsecs(6)));
        assert!(matches!(
            f.lifecycle.refresh(&pair.refresh_token.0).await,
            Err(TokenError::Revoked)
        ));
    }

    /// Counts calls, serves at most one fixed row and optionally fails
    /// reads or writes.
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
        row: Option<RefreshTokenRecord>,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl CountingStore {
        fn outcome<T>(&self, fail: bool, ok: T) -> Result<T, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if fail {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            Ok(ok)
        }
    }

    #[async_trait::async_trait]
    impl RefreshTokenStore for CountingStore {
        async fn insert(&self, _record: &RefreshTokenRecord) -> Result<(), StoreError> {
            self.outcome(self.fail_writes, ())
        }

        async fn find_by_hash(
            &self,
            _token_hash: &str,
        ) -> Result<Option<RefreshTokenRecord>, StoreError> {
            self.outcome(self.fail_reads, self.row.clone())
        }

        async fn mark_revoked(
            &self,
            _token_hash: &str,
            _revoked_at: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            self.outcome(self.fail_writes, true)
        }

        async fn purge_expired(&self, _before: DateTime<Utc>) -> Result<u64, StoreError> {
            self.outcome(self.fail_writes, 0)
        }
    }

    fn counting_lifecycle(store: Arc<CountingStore>) -> RealTokenLifecycle {
        RealTokenLifecycle::new(
            store,
            codec(),
            Arc::new(SystemClock),
            TokenPolicy::default(),
        )
    }

    #[tokio::test]
    async fn failed_write_returns_no_tokens() {
        let store = Arc::new(CountingStore {
            fail_writes: true,
            ..Default::default()
        });
        let lifecycle = counting_lifecycle(store.clone());
        assert!(matches!(
            lifecycle.issue(UserId::new_random()).await,
            Err(TokenError::StoreUnavailable(_))
        ));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_refresh_token_skips_the_store() {
        let store = Arc::new(CountingStore::default());
        let lifecycle = counting_lifecycle(store.clone());

        for bad in ["", "short", "not hex at all but long enough to pass a length check........"] {
            assert!(matches!(lifecycle.refresh(bad).await, Err(TokenError::Malformed)));
            assert!(matches!(lifecycle.revoke(bad).await, Err(TokenError::Malformed)));
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    fn active_row() -> RefreshTokenRecord {
        let now = Utc::now().trunc_subsecs(6);
        RefreshTokenRecord {
            token_hash: hash_refresh_token(&RefreshToken("ab".repeat(32))),
            user_id: UserId::new_random(),
            issued_at: now,
            expires_at: now + Duration::days(30),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn failed_read_surfaces_as_store_unavailable() {
        let store = Arc::new(CountingStore {
            row: Some(active_row()),
            fail_reads: true,
            ..Default::default()
        });
        let lifecycle = counting_lifecycle(store.clone());
        let token = "ab".repeat(32);

        assert!(matches!(
            lifecycle.refresh(&token).await,
            Err(TokenError::StoreUnavailable(_))
        ));
        assert!(matches!(
            lifecycle.revoke(&token).await,
            Err(TokenError::StoreUnavailable(_))
        ));
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_revoke_write_surfaces_as_store_unavailable() {
        let store = Arc::new(CountingStore {
            row: Some(active_row()),
            fail_writes: true,
            ..Default::default()
        });
        let lifecycle = counting_lifecycle(store.clone());
        let token = "ab".repeat(32);

        assert!(matches!(
            lifecycle.revoke(&token).await,
            Err(TokenError::StoreUnavailable(_))
        ));
        // lookup, then the conditional update
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);

        // refresh only reads, so it still works
        assert!(lifecycle.refresh(&token).await.is_ok());
    }
}
