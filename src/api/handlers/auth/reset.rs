//! Password reset endpoints.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::api::email::{dispatch, MessageKind, MessageSender, OutboundMessage};

use super::error::AuthError;
use super::model::Account;
use super::password::{acceptable_password, hash_password, MIN_PASSWORD_LENGTH};
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::establish_session;
use super::state::AuthState;
use super::store::{AccountStore, TokenPurpose};
use super::types::{ForgotPasswordRequest, ForgotPasswordResponse, ResetPasswordRequest};
use super::utils::{
    build_reset_url, extract_client_ip, generate_one_time_token, hash_one_time_token,
    normalize_email, valid_email,
};

/// Attach a fresh reset token (overwriting any prior one) and dispatch the
/// reset message.
async fn queue_reset(
    state: &AuthState,
    store: &dyn AccountStore,
    sender: &dyn MessageSender,
    account: &Account,
) -> Result<(), AuthError> {
    let token = generate_one_time_token().map_err(AuthError::Internal)?;
    let token_hash = hash_one_time_token(&token);
    let expires_at = Utc::now() + Duration::seconds(state.config().reset_ttl_seconds());

    store
        .store_pending_token(account.id, TokenPurpose::Reset, &token_hash, expires_at)
        .await?;

    let reset_url = build_reset_url(state.config().frontend_base_url(), &token);
    dispatch(
        sender,
        &OutboundMessage {
            to: account.email.clone(),
            kind: MessageKind::PasswordReset,
            payload: json!({
                "email": account.email,
                "reset_url": reset_url,
            }),
        },
    );
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 202, description = "Reset message queued if the address is registered", body = ForgotPasswordResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn AccountStore>>,
    sender: Extension<Arc<dyn MessageSender>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<Response, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::Validation("Missing payload".to_string())),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation(
            "Please provide a valid email address.".to_string(),
        ));
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ForgotPassword)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::ForgotPassword)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    // The response is the same whether or not the address is registered.
    match store.find_by_email(&email).await {
        Ok(Some(account)) => {
            queue_reset(
                auth_state.0.as_ref(),
                store.0.as_ref(),
                sender.0.as_ref(),
                &account,
            )
            .await?;
        }
        Ok(None) => {}
        Err(err) => {
            error!("failed to lookup account for password reset: {err}");
        }
    }

    let body = ForgotPasswordResponse {
        message: "If that address is registered, a reset link is on its way.".to_string(),
    };
    Ok((StatusCode::ACCEPTED, Json(body)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset, session established", body = super::types::SessionResponse),
        (status = 400, description = "Invalid or expired token", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Response, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::Validation("Missing payload".to_string())),
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(AuthError::Validation("Missing token".to_string()));
    }
    if request.password != request.password_confirm {
        return Err(AuthError::Validation("Passwords do not match.".to_string()));
    }
    if !acceptable_password(&request.password) {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long."
        )));
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ResetPassword)
        == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    // Atomic consume guarantees a raw token redeems at most once, even when
    // presented concurrently.
    let token_hash = hash_one_time_token(token);
    let account = store
        .consume_pending_token(TokenPurpose::Reset, &token_hash, Utc::now())
        .await?
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    let password_hash = hash_password(&request.password).map_err(AuthError::Internal)?;
    let changed_at = Utc::now();
    store
        .set_password(account.id, &password_hash, changed_at)
        .await?;

    // Sessions issued before this instant are now stale; the one we are
    // about to issue carries a fresh `iat`.
    establish_session(&auth_state, &account)
}
