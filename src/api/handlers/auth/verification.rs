//! Email verification endpoints.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::api::email::{dispatch, MessageKind, MessageSender, OutboundMessage};

use super::error::AuthError;
use super::model::Account;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::establish_session;
use super::state::AuthState;
use super::store::{AccountStore, TokenPurpose};
use super::types::{ResendVerificationRequest, VerifyEmailRequest};
use super::utils::{
    build_verify_url, extract_client_ip, generate_one_time_token, hash_one_time_token,
    normalize_email, valid_email,
};

/// Attach a fresh verification token to the account (overwriting any prior
/// one) and dispatch the verification message.
pub(super) async fn queue_verification(
    state: &AuthState,
    store: &dyn AccountStore,
    sender: &dyn MessageSender,
    account: &Account,
) -> Result<(), AuthError> {
    let token = generate_one_time_token().map_err(AuthError::Internal)?;
    let token_hash = hash_one_time_token(&token);
    let expires_at = Utc::now() + Duration::seconds(state.config().verification_ttl_seconds());

    store
        .store_pending_token(account.id, TokenPurpose::Verification, &token_hash, expires_at)
        .await?;

    let verify_url = build_verify_url(state.config().frontend_base_url(), &token);
    dispatch(
        sender,
        &OutboundMessage {
            to: account.email.clone(),
            kind: MessageKind::Verification,
            payload: json!({
                "email": account.email,
                "verify_url": verify_url,
            }),
        },
    );
    Ok(())
}

/// Whether a resend should be suppressed because the pending token was
/// generated less than `cooldown_seconds` ago.
pub(super) fn resend_cooldown_active(
    pending_expires_at: Option<DateTime<Utc>>,
    ttl_seconds: i64,
    cooldown_seconds: i64,
    now: DateTime<Utc>,
) -> bool {
    // The generation instant is derived from the stored expiry; no extra
    // bookkeeping column needed.
    let Some(expires_at) = pending_expires_at else {
        return false;
    };
    let generated_at = expires_at - Duration::seconds(ttl_seconds);
    now < generated_at + Duration::seconds(cooldown_seconds)
}

#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified, session established", body = super::types::SessionResponse),
        (status = 400, description = "Invalid or expired token", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> Result<Response, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::Validation("Missing payload".to_string())),
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(AuthError::Validation("Missing token".to_string()));
    }

    // Rate limits come before any token work to avoid amplification.
    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::VerifyEmail)
        == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    // Hash the presented token; raw values are never used for lookup, and
    // invalid vs expired is deliberately indistinguishable.
    let token_hash = hash_one_time_token(token);
    let account = store
        .consume_pending_token(TokenPurpose::Verification, &token_hash, Utc::now())
        .await?
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    establish_session(&auth_state, &account)
}

#[utoipa::path(
    post,
    path = "/v1/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 204, description = "Resend accepted")
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn AccountStore>>,
    sender: Extension<Arc<dyn MessageSender>>,
    payload: Option<Json<ResendVerificationRequest>>,
) -> Response {
    // This endpoint is intentionally opaque: every outcome is 204 so it
    // cannot be used to probe which addresses have accounts.
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return StatusCode::NO_CONTENT.into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return StatusCode::NO_CONTENT.into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ResendVerification)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::ResendVerification)
            == RateLimitDecision::Limited
    {
        return StatusCode::NO_CONTENT.into_response();
    }

    let account = match store.find_by_email(&email).await {
        Ok(Some(account)) => account,
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("failed to lookup account for resend: {err}");
            return StatusCode::NO_CONTENT.into_response();
        }
    };

    if account.is_email_verified {
        return StatusCode::NO_CONTENT.into_response();
    }

    if resend_cooldown_active(
        account.email_verification_expires_at,
        auth_state.config().verification_ttl_seconds(),
        auth_state.config().resend_cooldown_seconds(),
        Utc::now(),
    ) {
        return StatusCode::NO_CONTENT.into_response();
    }

    if let Err(err) = queue_verification(
        auth_state.0.as_ref(),
        store.0.as_ref(),
        sender.0.as_ref(),
        &account,
    )
    .await
    {
        error!("failed to queue verification resend: {err}");
    }
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_active_right_after_generation() {
        let now = Utc::now();
        let ttl = 24 * 60 * 60;
        // Token generated "now": expiry is now + ttl.
        let expires_at = Some(now + Duration::seconds(ttl));
        assert!(resend_cooldown_active(expires_at, ttl, 60, now));
        assert!(resend_cooldown_active(
            expires_at,
            ttl,
            60,
            now + Duration::seconds(59)
        ));
        assert!(!resend_cooldown_active(
            expires_at,
            ttl,
            60,
            now + Duration::seconds(60)
        ));
    }

    #[test]
    fn no_pending_token_means_no_cooldown() {
        assert!(!resend_cooldown_active(None, 3600, 60, Utc::now()));
    }
}
