//! Request-admission gate for protected endpoints.
//!
//! The checks run in a fixed order: token presence, signature/expiry,
//! account existence, session freshness against the last password change,
//! email verification, and finally lock state. Role checks are a separate
//! concern layered on top via [`require_role`].

use axum::http::HeaderMap;
use chrono::Utc;

use super::error::AuthError;
use super::lockout;
use super::model::{Account, Role};
use super::state::AuthState;
use super::store::AccountStore;
use super::token::TokenError;
use super::utils::extract_session_token;

/// Resolve the request's session token into an admitted account.
///
/// # Errors
/// `Unauthenticated` for missing/invalid/expired/stale tokens and vanished
/// accounts, `Forbidden` for unverified emails, `Locked` while a lock
/// window is active.
pub async fn require_account(
    headers: &HeaderMap,
    state: &AuthState,
    store: &dyn AccountStore,
) -> Result<Account, AuthError> {
    let Some(token) = extract_session_token(headers) else {
        return Err(AuthError::Unauthenticated(
            "You are not logged in. Please log in to get access.".to_string(),
        ));
    };

    let session = state.tokens().validate(&token).map_err(|err| {
        let message = match err {
            TokenError::Expired => "Your session has expired. Please log in again.",
            TokenError::BadSignature | TokenError::Malformed => {
                "Invalid token. Please log in again."
            }
        };
        AuthError::Unauthenticated(message.to_string())
    })?;

    let account = store
        .find_by_id(session.account_id)
        .await?
        .ok_or_else(|| {
            AuthError::Unauthenticated(
                "The account belonging to this token no longer exists.".to_string(),
            )
        })?;

    // Second-granularity comparison, matching the token's `iat` resolution:
    // a token issued in the same second as the change stays valid.
    if session.issued_at < account.password_changed_at.timestamp() {
        return Err(AuthError::Unauthenticated(
            "Password was changed recently. Please log in again.".to_string(),
        ));
    }

    if !account.is_email_verified {
        return Err(AuthError::Forbidden(
            "Please verify your email address to continue.".to_string(),
        ));
    }

    let now = Utc::now();
    if lockout::is_locked(account.lock_until, now) {
        let retry_after_seconds =
            lockout::retry_after_seconds(account.lock_until, now).unwrap_or(0);
        return Err(AuthError::Locked {
            retry_after_seconds,
        });
    }

    Ok(account)
}

/// Authorization helper for role-restricted routes.
///
/// # Errors
/// `Forbidden` when the account's role is not in `allowed`.
pub fn require_role(account: &Account, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&account.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        ))
    }
}
