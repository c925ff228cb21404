//! Endpoints for the authenticated account itself.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;

use super::error::AuthError;
use super::gate::require_account;
use super::model::AccountResponse;
use super::password::{acceptable_password, hash_password, verify_password, MIN_PASSWORD_LENGTH};
use super::session::establish_session;
use super::state::AuthState;
use super::store::AccountStore;
use super::types::UpdatePasswordRequest;

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Not authenticated", body = String),
        (status = 403, description = "Email not verified", body = String)
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn AccountStore>>,
) -> Result<Response, AuthError> {
    let account = require_account(&headers, &auth_state, store.0.as_ref()).await?;
    Ok(Json(AccountResponse::from(&account)).into_response())
}

#[utoipa::path(
    patch,
    path = "/v1/auth/password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated, fresh session established", body = super::types::SessionResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Not authenticated or wrong current password", body = String)
    ),
    tag = "auth"
)]
pub async fn update_password(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<UpdatePasswordRequest>>,
) -> Result<Response, AuthError> {
    let account = require_account(&headers, &auth_state, store.0.as_ref()).await?;

    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::Validation("Missing payload".to_string())),
    };

    if !verify_password(&request.current_password, &account.password_hash) {
        return Err(AuthError::Unauthenticated(
            "Your current password is incorrect.".to_string(),
        ));
    }
    if !acceptable_password(&request.new_password) {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long."
        )));
    }

    let password_hash = hash_password(&request.new_password).map_err(AuthError::Internal)?;
    store
        .set_password(account.id, &password_hash, Utc::now())
        .await?;

    // Every previously issued token is stale from this point; hand the
    // caller a fresh one.
    establish_session(&auth_state, &account)
}

#[utoipa::path(
    delete,
    path = "/v1/auth/me",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Not authenticated", body = String)
    ),
    tag = "auth"
)]
pub async fn delete_me(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn AccountStore>>,
) -> Result<Response, AuthError> {
    let account = require_account(&headers, &auth_state, store.0.as_ref()).await?;
    // Hard delete; the system keeps no inactive ghosts.
    store.delete_account(account.id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
