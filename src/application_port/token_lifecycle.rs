use crate::domain_model::UserId;
use crate::domain_port::StoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Length of an encoded refresh token: 32 random bytes as lowercase hex.
pub const REFRESH_TOKEN_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token malformed")]
    Malformed,
    #[error("token not found")]
    NotFound,
    #[error("token revoked")]
    Revoked,
    #[error("token expired")]
    Expired,
    #[error("token signature invalid")]
    InvalidSignature,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for TokenError {
    fn from(err: StoreError) -> Self {
        TokenError::StoreUnavailable(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

impl RefreshToken {
    /// Shape check only. Runs before any store access.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let well_formed = raw.len() == REFRESH_TOKEN_LEN
            && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if well_formed {
            Ok(RefreshToken(raw.to_owned()))
        } else {
            Err(TokenError::Malformed)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: RefreshToken,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub access_token: AccessToken,
    pub access_token_expires_at: DateTime<Utc>,
}

/// Claims recovered from an access token whose signature checked out.
/// Expiry has not been evaluated yet.
#[derive(Debug, Clone)]
pub struct SignedAccess {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenCodec: Send + Sync {
    fn sign_access(
        &self,
        user: UserId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessToken, TokenError>;

    /// Verifies signature, issuer and audience. Does not look at `exp`.
    fn decode_access(&self, token: &AccessToken) -> Result<SignedAccess, TokenError>;
}

#[async_trait::async_trait]
pub trait TokenLifecycle: Send + Sync {
    /// Mint an access/refresh pair for an already authenticated principal.
    async fn issue(&self, user: UserId) -> Result<TokenPair, TokenError>;

    async fn verify_access(&self, access_token: &str) -> Result<UserId, TokenError>;

    /// Mint a new access token. The refresh token row is left untouched.
    async fn refresh(&self, refresh_token: &str) -> Result<(UserId, AccessGrant), TokenError>;

    /// Idempotent; a second call keeps the first revocation time.
    async fn revoke(&self, refresh_token: &str) -> Result<(), TokenError>;
}
