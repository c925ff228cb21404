//! Account records and their outward-facing projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role attached to an account, consumed by authorization layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Artist,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Artist => "artist",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "artist" => Ok(Self::Artist),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One persisted identity/credential record.
///
/// This struct is internal state: it carries the password hash and pending
/// token hashes, so it is never serialized outward. Handlers respond with
/// [`AccountResponse`] instead.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    /// Normalized (trimmed, lowercased) email; unique per account.
    pub email: String,
    /// PHC-formatted Argon2id hash of the current password.
    pub password_hash: String,
    /// Bumped on every password mutation; session tokens issued before this
    /// timestamp are rejected by the gate.
    pub password_changed_at: DateTime<Utc>,
    pub is_email_verified: bool,
    pub email_verification_token_hash: Option<Vec<u8>>,
    pub email_verification_expires_at: Option<DateTime<Utc>>,
    pub password_reset_token_hash: Option<Vec<u8>>,
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub login_attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outward projection of an account, safe to serialize in responses.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.email.clone(),
            role: account.role,
            is_email_verified: account.is_email_verified,
            created_at: account.created_at,
            last_login: account.last_login,
        }
    }
}
