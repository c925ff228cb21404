use crate::api::{self, handlers::auth::AuthConfig, RateLimitSettings};
use anyhow::Result;
use secrecy::SecretString;

pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
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

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &self.dsn)
            .field("token_secret", &"***")
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("frontend_base_url", &self.frontend_base_url)
            .field("verification_ttl_seconds", &self.verification_ttl_seconds)
            .field("reset_ttl_seconds", &self.reset_ttl_seconds)
            .field("resend_cooldown_seconds", &self.resend_cooldown_seconds)
            .field("max_login_attempts", &self.max_login_attempts)
            .field("lock_duration_seconds", &self.lock_duration_seconds)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field(
                "rate_limit_window_seconds",
                &self.rate_limit_window_seconds,
            )
            .finish()
    }
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_verification_ttl_seconds(args.verification_ttl_seconds)
        .with_reset_ttl_seconds(args.reset_ttl_seconds)
        .with_resend_cooldown_seconds(args.resend_cooldown_seconds)
        .with_max_login_attempts(args.max_login_attempts)
        .with_lock_duration_seconds(args.lock_duration_seconds);

    let rate_limit = RateLimitSettings {
        max_requests: args.rate_limit_max_requests,
        window_seconds: args.rate_limit_window_seconds,
    };

    api::new(
        args.port,
        args.dsn,
        auth_config,
        &args.token_secret,
        rate_limit,
    )
    .await
}
