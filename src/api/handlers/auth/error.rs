//! Error taxonomy for the auth surface and its HTTP mapping.
//!
//! External messages stay generic on purpose: invalid-login and
//! invalid-token failures never reveal which part was wrong, and internal
//! failures are logged in full server-side but surfaced as a bare 500.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

use super::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No, invalid, expired, or stale token, or wrong credentials.
    #[error("{0}")]
    Unauthenticated(String),
    /// Valid identity, insufficient state (unverified email).
    #[error("{0}")]
    Forbidden(String),
    /// Account lock; carries the remaining lock window in seconds.
    #[error("account is temporarily locked")]
    Locked { retry_after_seconds: i64 },
    /// Per-client request budget exhausted.
    #[error("too many requests")]
    RateLimited,
    #[error("an account with this email already exists")]
    DuplicateIdentity,
    /// Verification/reset token failures; invalid and expired are
    /// deliberately indistinguishable to the caller.
    #[error("token is invalid or has expired")]
    InvalidOrExpiredToken,
    #[error("{0}")]
    Validation(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::DuplicateIdentity,
            StoreError::Internal(err) => Self::Internal(err),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated(message) => {
                (StatusCode::UNAUTHORIZED, message).into_response()
            }
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message).into_response(),
            Self::Locked {
                retry_after_seconds,
            } => {
                let minutes = (retry_after_seconds + 59) / 60;
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    format!("Account is temporarily locked. Try again in {minutes} minutes."),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                    response.headers_mut().insert(RETRY_AFTER, value);
                }
                response
            }
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later.".to_string(),
            )
                .into_response(),
            Self::DuplicateIdentity => (
                StatusCode::CONFLICT,
                "An account with this email already exists.".to_string(),
            )
                .into_response(),
            Self::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                "Token is invalid or has expired.".to_string(),
            )
                .into_response(),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Internal(err) => {
                // Full detail stays server-side.
                error!("internal auth error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong.".to_string(),
                )
                    .into_response()
            }
        }
    }
}
