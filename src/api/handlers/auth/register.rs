//! Registration endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::email::MessageSender;

use super::error::AuthError;
use super::model::Role;
use super::password::{acceptable_password, hash_password, MIN_PASSWORD_LENGTH};
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::store::{AccountStore, NewAccount};
use super::types::{RegisterRequest, RegisterResponse};
use super::utils::{extract_client_ip, normalize_email, valid_email};
use super::verification::queue_verification;

/// Roles a caller may request for itself at registration. Admin accounts
/// are provisioned out of band.
fn requested_role(role: Option<&str>) -> Result<Role, AuthError> {
    match role {
        None | Some("user") => Ok(Role::User),
        Some("artist") => Ok(Role::Artist),
        Some(other) => Err(AuthError::Validation(format!(
            "Role '{other}' cannot be self-assigned."
        ))),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification message queued", body = RegisterResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 409, description = "Email already registered", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn AccountStore>>,
    sender: Extension<Arc<dyn MessageSender>>,
    payload: Option<Json<RegisterRequest>>,
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
    if request.password != request.password_confirm {
        return Err(AuthError::Validation("Passwords do not match.".to_string()));
    }
    if !acceptable_password(&request.password) {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long."
        )));
    }
    let role = requested_role(request.role.as_deref())?;

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Register)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::Register)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let password_hash = hash_password(&request.password).map_err(AuthError::Internal)?;
    let account = store
        .create_account(NewAccount {
            email,
            password_hash,
            role,
        })
        .await?;

    queue_verification(
        auth_state.0.as_ref(),
        store.0.as_ref(),
        sender.0.as_ref(),
        &account,
    )
    .await?;

    let body = RegisterResponse {
        message: "Verification email sent! Please check your email to verify your account."
            .to_string(),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}
