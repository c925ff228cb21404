//! Rate limiting primitives for auth flows.
//!
//! The fixed-window limiter is process-local by design; a horizontally
//! scaled deployment would need a shared counter instead.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub enum RateLimitAction {
    Register,
    Login,
    VerifyEmail,
    ResendVerification,
    ForgotPassword,
    ResetPassword,
}

impl RateLimitAction {
    fn key_prefix(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::VerifyEmail => "verify-email",
            Self::ResendVerification => "resend-verification",
            Self::ForgotPassword => "forgot-password",
            Self::ResetPassword => "reset-password",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn check_email(&self, _email: &str, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Fixed-window counter keyed by `(action, client key)`.
pub struct FixedWindowRateLimiter {
    max_requests: u32,
    window: Duration,
    entries: RwLock<HashMap<String, WindowEntry>>,
}

impl FixedWindowRateLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn check(&self, key: String) -> RateLimitDecision {
        let now = Instant::now();
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Evict stale windows on every check so the map stays bounded by
        // active clients.
        let window = self.window;
        entries.retain(|_, entry| now.duration_since(entry.window_start) < window);

        let entry = entries.entry(key).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });
        if entry.count >= self.max_requests {
            return RateLimitDecision::Limited;
        }
        entry.count += 1;
        RateLimitDecision::Allowed
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        // Without a client key there is nothing to count against.
        let Some(ip) = ip else {
            return RateLimitDecision::Allowed;
        };
        self.check(format!("{}:ip:{ip}", action.key_prefix()))
    }

    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision {
        self.check(format!("{}:email:{email}", action.key_prefix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Register),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_email("fan@example.com", RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn limits_after_max_requests_in_window() {
        let limiter = FixedWindowRateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert_eq!(
                limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn keys_are_scoped_by_action_and_client() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        // Different action, same IP: separate window.
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Register),
            RateLimitDecision::Allowed
        );
        // Different IP, same action: separate window.
        assert_eq!(
            limiter.check_ip(Some("5.6.7.8"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn missing_ip_is_not_counted() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));
        for _ in 0..5 {
            assert_eq!(
                limiter.check_ip(None, RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_millis(10));
        assert_eq!(
            limiter.check_email("fan@example.com", RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_email("fan@example.com", RateLimitAction::Login),
            RateLimitDecision::Limited
        );
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(
            limiter.check_email("fan@example.com", RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn stale_windows_are_evicted() {
        let limiter = FixedWindowRateLimiter::new(10, Duration::from_millis(1));
        limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login);
        assert_eq!(limiter.tracked_keys(), 1);
        std::thread::sleep(Duration::from_millis(5));
        limiter.check_ip(Some("5.6.7.8"), RateLimitAction::Login);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn concurrent_checks_do_not_lose_counts() {
        let limiter = std::sync::Arc::new(FixedWindowRateLimiter::new(
            1000,
            Duration::from_secs(60),
        ));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login);
                }
            }));
        }
        for handle in handles {
            let _ = handle.join();
        }
        // 800 increments recorded; the next 200 stay allowed, then limited.
        for _ in 0..200 {
            assert_eq!(
                limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }
}
