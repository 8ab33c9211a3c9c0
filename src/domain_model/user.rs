use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable principal identifier, assigned once at registration.
#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    pub fn new_random() -> Self {
        UserId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(UserId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match e.message.as_deref() {
                    Some(msg) => msg.to_owned(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        ValidationError(messages.join("; "))
    }
}

/// Trims surrounding whitespace and lowercases, so one address maps to
/// one account on every backend.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Extra address rules on top of `#[validate(email)]`: no leading,
/// trailing or doubled dot in the local part, and an alphabetic top-level
/// domain of at least two letters.
pub fn strict_email(email: &str) -> Result<(), validator::ValidationError> {
    let reject = || {
        let mut err = validator::ValidationError::new("email");
        err.message = Some("email is not a valid address".into());
        err
    };

    let Some((local, domain)) = email.rsplit_once('@') else {
        return Err(reject());
    };
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(reject());
    }
    let tld = domain.rsplit('.').next().unwrap_or_default();
    if !domain.contains('.') || tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(reject());
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user, without the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserProfile {
    fn from(rec: &UserRecord) -> Self {
        UserProfile {
            id: rec.user_id,
            username: rec.username.clone(),
            email: rec.email.clone(),
            created_at: rec.created_at,
            updated_at: rec.updated_at,
        }
    }
}
