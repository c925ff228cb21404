//! Token, credential-flow, and rate-limit arguments.

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_TOKEN_SECRET: &str = "token-secret";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    let command = with_flow_args(command);
    with_rate_limit_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long("token-secret")
                .help("Secret used to sign session tokens")
                .env("CLEF_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session token TTL in seconds")
                .env("CLEF_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_flow_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used for verification and reset links")
                .env("CLEF_FRONTEND_BASE_URL")
                .default_value("https://clef.dev"),
        )
        .arg(
            Arg::new("verification-ttl-seconds")
                .long("verification-ttl-seconds")
                .help("Email verification token TTL in seconds")
                .env("CLEF_VERIFICATION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("reset-ttl-seconds")
                .long("reset-ttl-seconds")
                .help("Password reset token TTL in seconds")
                .env("CLEF_RESET_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("resend-cooldown-seconds")
                .long("resend-cooldown-seconds")
                .help("Cooldown before resending verification messages")
                .env("CLEF_RESEND_COOLDOWN_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("max-login-attempts")
                .long("max-login-attempts")
                .help("Failed logins before the account is locked")
                .env("CLEF_MAX_LOGIN_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new("lock-duration-seconds")
                .long("lock-duration-seconds")
                .help("How long a lockout lasts in seconds")
                .env("CLEF_LOCK_DURATION_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_rate_limit_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("rate-limit-max-requests")
                .long("rate-limit-max-requests")
                .help("Requests allowed per client per window on auth endpoints (0 disables)")
                .env("CLEF_RATE_LIMIT_MAX_REQUESTS")
                .default_value("100")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("rate-limit-window-seconds")
                .long("rate-limit-window-seconds")
                .help("Rate limit window in seconds")
                .env("CLEF_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub token_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub frontend_base_url: String,
    pub verification_ttl_seconds: i64,
    pub reset_ttl_seconds: i64,
    pub resend_cooldown_seconds: i64,
    pub max_login_attempts: i32,
    pub lock_duration_seconds: i64,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u64,
}

impl Options {
    /// Read all auth options out of parsed matches.
    ///
    /// # Errors
    /// Returns an error when a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --token-secret")?;

        Ok(Self {
            token_secret: SecretString::from(token_secret),
            session_ttl_seconds: matches
                .get_one::<i64>("session-ttl-seconds")
                .copied()
                .unwrap_or(2_592_000),
            frontend_base_url: matches
                .get_one::<String>("frontend-base-url")
                .cloned()
                .unwrap_or_else(|| "https://clef.dev".to_string()),
            verification_ttl_seconds: matches
                .get_one::<i64>("verification-ttl-seconds")
                .copied()
                .unwrap_or(86_400),
            reset_ttl_seconds: matches
                .get_one::<i64>("reset-ttl-seconds")
                .copied()
                .unwrap_or(600),
            resend_cooldown_seconds: matches
                .get_one::<i64>("resend-cooldown-seconds")
                .copied()
                .unwrap_or(60),
            max_login_attempts: matches
                .get_one::<i32>("max-login-attempts")
                .copied()
                .unwrap_or(5),
            lock_duration_seconds: matches
                .get_one::<i64>("lock-duration-seconds")
                .copied()
                .unwrap_or(1800),
            rate_limit_max_requests: matches
                .get_one::<u32>("rate-limit-max-requests")
                .copied()
                .unwrap_or(100),
            rate_limit_window_seconds: matches
                .get_one::<u64>("rate-limit-window-seconds")
                .copied()
                .unwrap_or(900),
        })
    }
}
