//! Signed session tokens.
//!
//! The codec is constructed once at startup from the configured secret and
//! passed around explicitly; there is no global key state. Tokens are
//! stateless HS256 JWTs binding the account id and issuance time, so the
//! only revocation mechanism is the gate's `password_changed_at` check.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Validated session token contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionToken {
    pub account_id: Uuid,
    /// Issuance time as Unix seconds; compared against
    /// `Account::password_changed_at` by the gate.
    pub issued_at: i64,
}

/// Why a presented token was rejected.
///
/// `Expired` is distinguished from the other two so callers can tell the
/// user to log in again rather than treat the token as hostile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token is malformed")]
    Malformed,
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            ttl_seconds,
        }
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a token for the account, valid from now for the configured TTL.
    ///
    /// # Errors
    /// Returns an error if JWT encoding fails.
    pub fn issue(&self, account_id: Uuid) -> anyhow::Result<String> {
        self.issue_at(account_id, Utc::now())
    }

    /// Issue a token with an explicit issuance instant.
    ///
    /// # Errors
    /// Returns an error if JWT encoding fails.
    pub fn issue_at(&self, account_id: Uuid, issued_at: DateTime<Utc>) -> anyhow::Result<String> {
        let expires_at = issued_at + Duration::seconds(self.ttl_seconds);
        let claims = Claims {
            sub: account_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| anyhow::anyhow!("failed to sign session token: {err}"))
    }

    /// Validate a presented token and return its contents.
    ///
    /// # Errors
    /// `Expired` for an otherwise valid token past its expiry,
    /// `BadSignature` when the signature check fails, `Malformed` for
    /// anything that does not parse as one of our tokens.
    pub fn validate(&self, token: &str) -> Result<SessionToken, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // No clock skew allowance; expiry comparisons are exact.
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            }
        })?;

        let account_id = Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::Malformed)?;
        Ok(SessionToken {
            account_id,
            issued_at: data.claims.iat,
        })
    }
}
