//! Login endpoint: credential check, lockout accounting, token issuance.

use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::lockout;
use super::password::verify_password;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::establish_session;
use super::state::AuthState;
use super::store::AccountStore;
use super::types::{LoginRequest, SessionResponse};
use super::utils::{extract_client_ip, normalize_email, valid_email};

/// Shared generic message: never reveals whether the email or the password
/// was wrong.
const BAD_CREDENTIALS: &str = "Incorrect email or password.";

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 401, description = "Incorrect credentials", body = String),
        (status = 403, description = "Email not verified", body = String),
        (status = 429, description = "Account locked or rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::Validation("Missing payload".to_string())),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) || request.password.is_empty() {
        return Err(AuthError::Validation(
            "Please provide email and password.".to_string(),
        ));
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Login)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::Login)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let Some(account) = store.find_by_email(&email).await? else {
        return Err(AuthError::Unauthenticated(BAD_CREDENTIALS.to_string()));
    };

    // An active lock rejects the attempt before the password is even
    // checked; correct credentials make no difference while locked.
    let now = Utc::now();
    if lockout::is_locked(account.lock_until, now) {
        let retry_after_seconds =
            lockout::retry_after_seconds(account.lock_until, now).unwrap_or(0);
        return Err(AuthError::Locked {
            retry_after_seconds,
        });
    }

    if !verify_password(&request.password, &account.password_hash) {
        let state = store
            .record_login_failure(account.id, Utc::now(), &auth_state.config().lockout_policy())
            .await?;
        if state.lock_until.is_some() {
            info!(account_id = %account.id, "account locked after repeated login failures");
        }
        return Err(AuthError::Unauthenticated(BAD_CREDENTIALS.to_string()));
    }

    if !account.is_email_verified {
        return Err(AuthError::Forbidden(
            "Please verify your email address before logging in.".to_string(),
        ));
    }

    store.record_login_success(account.id, Utc::now()).await?;

    establish_session(&auth_state, &account)
}
