//! Password hashing and verification.
//!
//! Argon2id with a random per-record salt. Hashing cost is the deliberate
//! latency floor for login: verification is meant to take tens of
//! milliseconds so offline brute force stays expensive.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

/// Minimum accepted password length, enforced at registration and reset.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a raw password into a PHC string for storage.
///
/// # Errors
/// Returns an error if the hashing backend fails; the raw password is never
/// included in the error.
pub fn hash_password(raw: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("password hashing failed: {err}"))?;
    Ok(hash.to_string())
}

/// Verify a raw password against a stored PHC hash.
///
/// Fails closed: a mismatch, an undecodable stored hash, or a backend error
/// all return `false`. Comparison is constant-time inside the verifier.
#[must_use]
pub fn verify_password(raw: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            error!("stored password hash is not valid PHC: {err}");
            return false;
        }
    };
    Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .is_ok()
}

/// Check the password policy for new passwords.
#[must_use]
pub fn acceptable_password(raw: &str) -> bool {
    raw.chars().count() >= MIN_PASSWORD_LENGTH
}
