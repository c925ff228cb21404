//! Durable keyed storage for account records.
//!
//! The store contract is small but strict: duplicate-email rejection on
//! create, and single atomic operations for failure counting and one-time
//! token consumption. Nothing here filters records implicitly; deletion is
//! hard, so there is no hidden "inactive" state to hide.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::lockout::{LockoutPolicy, LockoutState};
use super::model::{Account, Role};

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// Which one-time token slot an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenPurpose {
    Verification,
    Reset,
}

/// Input for account creation; the email must already be normalized and the
/// password already hashed.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The (case-insensitively normalized) email is already registered.
    #[error("email is already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an account; fails with [`StoreError::DuplicateEmail`] when the
    /// email is taken.
    async fn create_account(&self, new_account: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_email(&self, email_normalized: &str)
        -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Replace the password hash, stamp `password_changed_at`, and clear any
    /// pending reset token.
    async fn set_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Record one failed login as a single atomic mutation and return the
    /// resulting counter/lock state.
    async fn record_login_failure(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<LockoutState, StoreError>;

    /// Reset the failure counter, clear any lock, and stamp `last_login`.
    async fn record_login_success(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Attach a pending one-time token, overwriting any prior token of the
    /// same purpose.
    async fn store_pending_token(
        &self,
        id: Uuid,
        purpose: TokenPurpose,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically find-and-clear the account holding an unexpired token with
    /// this hash. At most one concurrent caller can succeed. Consuming a
    /// verification token also marks the email verified.
    async fn consume_pending_token(
        &self,
        purpose: TokenPurpose,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError>;

    /// Hard-delete the account; returns whether a record was removed.
    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Cheap liveness check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
