//! # Clef (Accounts & Authentication)
//!
//! `clef` is the accounts service of the Clef music catalog: it owns
//! credential issuance, session tokens, email verification, password reset,
//! and brute-force lockout. Catalog data (songs, albums, artists,
//! playlists) is served elsewhere; this service only decides who the caller
//! is and whether they may log in.
//!
//! ## Accounts
//!
//! - **Email identity:** emails are normalized to trimmed lowercase and are
//!   unique per account. Logins are refused until the address is verified.
//! - **Credentials:** passwords are stored as salted Argon2id hashes and
//!   never serialized outward.
//! - **Roles:** `user`, `artist`, and `admin`, consumed by authorization
//!   layered on top of the gate. Admin accounts are provisioned out of band.
//!
//! ## Sessions
//!
//! Session tokens are stateless signed JWTs carrying the account id and
//! issuance time. There is no server-side session table: logout is
//! advisory, and changing the password is the revocation mechanism (tokens
//! issued before `password_changed_at` are rejected as stale).
//!
//! ## One-time tokens
//!
//! Email verification and password reset use random one-time tokens whose
//! hashes are stored with absolute expiries. A token redeems at most once,
//! and regenerating one invalidates its predecessor.

pub mod api;
pub mod cli;

#[cfg(test)]
mod tests {
    #[test]
    fn package_name_is_stable() {
        // The CLI name and user agent derive from the package name.
        assert_eq!(env!("CARGO_PKG_NAME"), "clef");
    }
}
