//! Postgres-backed account store.
//!
//! Counter updates and token consumption are single `UPDATE` statements so
//! the row mutation is atomic on the database side; there is no
//! read-modify-write across round trips.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::super::lockout::{LockoutPolicy, LockoutState};
use super::super::model::{Account, Role};
use super::{AccountStore, NewAccount, StoreError, TokenPurpose};

const ACCOUNT_COLUMNS: &str = r"
    id, email, password_hash, password_changed_at, is_email_verified,
    email_verification_token_hash, email_verification_expires_at,
    password_reset_token_hash, password_reset_expires_at,
    login_attempts, lock_until, last_login, role, created_at, updated_at
";

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let role: String = row.get("role");
    let role: Role = role
        .parse()
        .map_err(|err: String| anyhow!("corrupt role column: {err}"))?;
    Ok(Account {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        password_changed_at: row.get("password_changed_at"),
        is_email_verified: row.get("is_email_verified"),
        email_verification_token_hash: row.get("email_verification_token_hash"),
        email_verification_expires_at: row.get("email_verification_expires_at"),
        password_reset_token_hash: row.get("password_reset_token_hash"),
        password_reset_expires_at: row.get("password_reset_expires_at"),
        login_attempts: row.get("login_attempts"),
        lock_until: row.get("lock_until"),
        last_login: row.get("last_login"),
        role,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create_account(&self, new_account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            r"
            INSERT INTO accounts (email, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING {ACCOUNT_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(&new_account.email)
            .bind(&new_account.password_hash)
            .bind(new_account.role.as_str())
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", "INSERT INTO accounts"))
            .await;

        match row {
            Ok(row) => account_from_row(&row),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(StoreError::Internal(
                anyhow::Error::new(err).context("failed to insert account"),
            )),
        }
    }

    async fn find_by_email(
        &self,
        email_normalized: &str,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email_normalized)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "SELECT FROM accounts WHERE email"))
            .await
            .context("failed to lookup account by email")?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "SELECT FROM accounts WHERE id"))
            .await
            .context("failed to lookup account by id")?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn set_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = r"
            UPDATE accounts
            SET password_hash = $2,
                password_changed_at = $3,
                password_reset_token_hash = NULL,
                password_reset_expires_at = NULL,
                updated_at = $3
            WHERE id = $1
        ";
        sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .bind(changed_at)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", "UPDATE accounts SET password_hash"))
            .await
            .context("failed to set password")?;
        Ok(())
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<LockoutState, StoreError> {
        // Mirrors lockout::apply_failure as one atomic statement: active
        // locks are untouched, stale locks restart the count, and reaching
        // the threshold sets the lock window.
        let query = r"
            UPDATE accounts
            SET login_attempts = CASE
                    WHEN lock_until IS NOT NULL AND lock_until > $2 THEN login_attempts
                    WHEN lock_until IS NOT NULL THEN 1
                    WHEN login_attempts + 1 >= $3 THEN $3
                    ELSE login_attempts + 1
                END,
                lock_until = CASE
                    WHEN lock_until IS NOT NULL AND lock_until > $2 THEN lock_until
                    WHEN lock_until IS NOT NULL THEN NULL
                    WHEN login_attempts + 1 >= $3 THEN $4
                    ELSE NULL
                END,
                updated_at = $2
            WHERE id = $1
            RETURNING login_attempts, lock_until
        ";
        let row = sqlx::query(query)
            .bind(id)
            .bind(now)
            .bind(policy.max_attempts())
            .bind(now + policy.lock_duration())
            .fetch_one(&self.pool)
            .instrument(db_span("UPDATE", "UPDATE accounts SET login_attempts"))
            .await
            .context("failed to record login failure")?;
        Ok(LockoutState {
            login_attempts: row.get("login_attempts"),
            lock_until: row.get("lock_until"),
        })
    }

    async fn record_login_success(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError> {
        let query = r"
            UPDATE accounts
            SET login_attempts = 0,
                lock_until = NULL,
                last_login = $2,
                updated_at = $2
            WHERE id = $1
        ";
        sqlx::query(query)
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", "UPDATE accounts SET login_attempts = 0"))
            .await
            .context("failed to record login success")?;
        Ok(())
    }

    async fn store_pending_token(
        &self,
        id: Uuid,
        purpose: TokenPurpose,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Overwrite semantics: any prior pending token of this purpose is
        // replaced in the same statement.
        let query = match purpose {
            TokenPurpose::Verification => {
                r"
                UPDATE accounts
                SET email_verification_token_hash = $2,
                    email_verification_expires_at = $3,
                    updated_at = NOW()
                WHERE id = $1
                "
            }
            TokenPurpose::Reset => {
                r"
                UPDATE accounts
                SET password_reset_token_hash = $2,
                    password_reset_expires_at = $3,
                    updated_at = NOW()
                WHERE id = $1
                "
            }
        };
        sqlx::query(query)
            .bind(id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", "UPDATE accounts SET pending token"))
            .await
            .context("failed to store pending token")?;
        Ok(())
    }

    async fn consume_pending_token(
        &self,
        purpose: TokenPurpose,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        // Atomic find-and-clear: concurrent presenters race on the row
        // update and only one statement matches.
        let query = match purpose {
            TokenPurpose::Verification => format!(
                r"
                UPDATE accounts
                SET email_verification_token_hash = NULL,
                    email_verification_expires_at = NULL,
                    is_email_verified = TRUE,
                    updated_at = $2
                WHERE email_verification_token_hash = $1
                  AND email_verification_expires_at > $2
                RETURNING {ACCOUNT_COLUMNS}
                "
            ),
            TokenPurpose::Reset => format!(
                r"
                UPDATE accounts
                SET password_reset_token_hash = NULL,
                    password_reset_expires_at = NULL,
                    updated_at = $2
                WHERE password_reset_token_hash = $1
                  AND password_reset_expires_at > $2
                RETURNING {ACCOUNT_COLUMNS}
                "
            ),
        };
        let row = sqlx::query(&query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", "UPDATE accounts consume pending token"))
            .await
            .context("failed to consume pending token")?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError> {
        let query = "DELETE FROM accounts WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", "DELETE FROM accounts"))
            .await
            .context("failed to delete account")?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(db_span("ACQUIRE", "pool.acquire"))
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(db_span("PING", "connection.ping"))
            .await
            .context("failed to ping database")?;
        Ok(())
    }
}
