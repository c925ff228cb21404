//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the server action with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches.get_one::<String>("dsn").cloned();

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        token_secret: auth_opts.token_secret,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        frontend_base_url: auth_opts.frontend_base_url,
        verification_ttl_seconds: auth_opts.verification_ttl_seconds,
        reset_ttl_seconds: auth_opts.reset_ttl_seconds,
        resend_cooldown_seconds: auth_opts.resend_cooldown_seconds,
        max_login_attempts: auth_opts.max_login_attempts,
        lock_duration_seconds: auth_opts.lock_duration_seconds,
        rate_limit_max_requests: auth_opts.rate_limit_max_requests,
        rate_limit_window_seconds: auth_opts.rate_limit_window_seconds,
    }))
}
