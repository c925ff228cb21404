//! Session issuance and teardown.
//!
//! Sessions are stateless signed tokens; the cookie is a convenience for
//! browser clients and logout is advisory only (the cookie is overwritten
//! with an immediately expiring sentinel).

use axum::{
    Json,
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};

use super::error::AuthError;
use super::model::{Account, AccountResponse};
use super::state::{AuthConfig, AuthState};
use super::types::SessionResponse;

pub(crate) const SESSION_COOKIE_NAME: &str = "clef_session";

/// Issue a session token for the account and build the standard success
/// response: `{token, account}` plus the session cookie.
pub(super) fn establish_session(
    state: &AuthState,
    account: &Account,
) -> Result<Response, AuthError> {
    let token = state.tokens().issue(account.id).map_err(AuthError::Internal)?;

    let mut headers = HeaderMap::new();
    if let Ok(cookie) = session_cookie(state.config(), &token) {
        headers.insert(SET_COOKIE, cookie);
    }

    let body = SessionResponse {
        token,
        account: AccountResponse::from(account),
    };
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

/// Build a secure `HttpOnly` cookie carrying the session token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    auth_state: axum::extract::Extension<std::sync::Arc<AuthState>>,
) -> impl IntoResponse {
    // Tokens are stateless, so there is nothing server-side to revoke.
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, headers)
}
