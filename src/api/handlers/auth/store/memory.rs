//! In-memory account store.
//!
//! Used by the test suite and as the fallback when no database DSN is
//! configured. Every mutation happens under a single write-lock
//! acquisition, which gives the same atomicity the SQL store gets from
//! single-statement updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::super::lockout::{self, LockoutPolicy, LockoutState};
use super::super::model::Account;
use super::{AccountStore, NewAccount, StoreError, TokenPurpose};

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create_account(&self, new_account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts
            .values()
            .any(|account| account.email == new_account.email)
        {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: new_account.email,
            password_hash: new_account.password_hash,
            password_changed_at: now,
            is_email_verified: false,
            email_verification_token_hash: None,
            email_verification_expires_at: None,
            password_reset_token_hash: None,
            password_reset_expires_at: None,
            login_attempts: 0,
            lock_until: None,
            last_login: None,
            role: new_account.role,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_email(
        &self,
        email_normalized: &str,
    ) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|account| account.email == email_normalized)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn set_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.password_hash = password_hash.to_string();
            account.password_changed_at = changed_at;
            account.password_reset_token_hash = None;
            account.password_reset_expires_at = None;
            account.updated_at = changed_at;
        }
        Ok(())
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<LockoutState, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("account {id} not found"))?;
        let state =
            lockout::apply_failure(account.login_attempts, account.lock_until, now, policy);
        account.login_attempts = state.login_attempts;
        account.lock_until = state.lock_until;
        account.updated_at = now;
        Ok(state)
    }

    async fn record_login_success(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.login_attempts = 0;
            account.lock_until = None;
            account.last_login = Some(now);
            account.updated_at = now;
        }
        Ok(())
    }

    async fn store_pending_token(
        &self,
        id: Uuid,
        purpose: TokenPurpose,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("account {id} not found"))?;
        match purpose {
            TokenPurpose::Verification => {
                account.email_verification_token_hash = Some(token_hash.to_vec());
                account.email_verification_expires_at = Some(expires_at);
            }
            TokenPurpose::Reset => {
                account.password_reset_token_hash = Some(token_hash.to_vec());
                account.password_reset_expires_at = Some(expires_at);
            }
        }
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn consume_pending_token(
        &self,
        purpose: TokenPurpose,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        // Find-and-clear under one write lock: at most one caller wins.
        let mut accounts = self.accounts.write().await;
        let matching = accounts.values_mut().find(|account| match purpose {
            TokenPurpose::Verification => {
                account.email_verification_token_hash.as_deref() == Some(token_hash)
                    && account
                        .email_verification_expires_at
                        .is_some_and(|expiry| expiry > now)
            }
            TokenPurpose::Reset => {
                account.password_reset_token_hash.as_deref() == Some(token_hash)
                    && account
                        .password_reset_expires_at
                        .is_some_and(|expiry| expiry > now)
            }
        });

        let Some(account) = matching else {
            return Ok(None);
        };

        match purpose {
            TokenPurpose::Verification => {
                account.email_verification_token_hash = None;
                account.email_verification_expires_at = None;
                account.is_email_verified = true;
            }
            TokenPurpose::Reset => {
                account.password_reset_token_hash = None;
                account.password_reset_expires_at = None;
            }
        }
        account.updated_at = now;
        Ok(Some(account.clone()))
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::model::Role;
    use super::*;
    use anyhow::Result;
    use chrono::Duration;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() -> Result<()> {
        let store = MemoryAccountStore::new();
        store.create_account(new_account("a@x.com")).await?;
        let second = store.create_account(new_account("a@x.com")).await;
        assert!(matches!(second, Err(StoreError::DuplicateEmail)));
        Ok(())
    }

    #[tokio::test]
    async fn pending_token_overwrites_previous() -> Result<()> {
        let store = MemoryAccountStore::new();
        let account = store.create_account(new_account("a@x.com")).await?;
        let now = Utc::now();
        let expiry = now + Duration::hours(24);

        store
            .store_pending_token(account.id, TokenPurpose::Verification, b"old", expiry)
            .await?;
        store
            .store_pending_token(account.id, TokenPurpose::Verification, b"new", expiry)
            .await?;

        // The old raw token is now permanently unredeemable.
        assert!(store
            .consume_pending_token(TokenPurpose::Verification, b"old", now)
            .await?
            .is_none());
        let consumed = store
            .consume_pending_token(TokenPurpose::Verification, b"new", now)
            .await?;
        assert!(consumed.is_some_and(|account| account.is_email_verified));
        Ok(())
    }

    #[tokio::test]
    async fn consume_is_single_use() -> Result<()> {
        let store = MemoryAccountStore::new();
        let account = store.create_account(new_account("a@x.com")).await?;
        let now = Utc::now();
        store
            .store_pending_token(
                account.id,
                TokenPurpose::Reset,
                b"hash",
                now + Duration::minutes(10),
            )
            .await?;

        assert!(store
            .consume_pending_token(TokenPurpose::Reset, b"hash", now)
            .await?
            .is_some());
        assert!(store
            .consume_pending_token(TokenPurpose::Reset, b"hash", now)
            .await?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_not_consumable() -> Result<()> {
        let store = MemoryAccountStore::new();
        let account = store.create_account(new_account("a@x.com")).await?;
        let now = Utc::now();
        store
            .store_pending_token(account.id, TokenPurpose::Reset, b"hash", now)
            .await?;
        // expires_at == now is already expired; the comparison is strict.
        assert!(store
            .consume_pending_token(TokenPurpose::Reset, b"hash", now)
            .await?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_hard() -> Result<()> {
        let store = MemoryAccountStore::new();
        let account = store.create_account(new_account("a@x.com")).await?;
        assert!(store.delete_account(account.id).await?);
        assert!(store.find_by_id(account.id).await?.is_none());
        assert!(store.find_by_email("a@x.com").await?.is_none());
        assert!(!store.delete_account(account.id).await?);
        Ok(())
    }
}
