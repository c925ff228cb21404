//! Brute-force lockout policy.
//!
//! Lock status is always derived from `(lock_until, now)`; nothing is
//! cached. The state transition lives here as a pure function so the
//! in-memory store and the SQL store apply identical arithmetic.

use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_MAX_LOGIN_ATTEMPTS: i32 = 5;
pub const DEFAULT_LOCK_DURATION_SECONDS: i64 = 30 * 60;

#[derive(Clone, Copy, Debug)]
pub struct LockoutPolicy {
    max_attempts: i32,
    lock_duration: Duration,
}

impl LockoutPolicy {
    #[must_use]
    pub fn new(max_attempts: i32, lock_duration_seconds: i64) -> Self {
        Self {
            max_attempts,
            lock_duration: Duration::seconds(lock_duration_seconds),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    #[must_use]
    pub fn lock_duration(&self) -> Duration {
        self.lock_duration
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOGIN_ATTEMPTS, DEFAULT_LOCK_DURATION_SECONDS)
    }
}

/// Attempt counter and lock window after a recorded failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockoutState {
    pub login_attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
}

/// Whether the account is locked at `now`.
#[must_use]
pub fn is_locked(lock_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    lock_until.is_some_and(|until| until > now)
}

/// Seconds until an active lock expires, rounded up; `None` when unlocked.
#[must_use]
pub fn retry_after_seconds(
    lock_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<i64> {
    let until = lock_until?;
    if until <= now {
        return None;
    }
    let remaining = until - now;
    let mut seconds = remaining.num_seconds();
    if remaining - Duration::seconds(seconds) > Duration::zero() {
        seconds += 1;
    }
    Some(seconds)
}

/// Apply one recorded failure to the counter/lock pair.
///
/// - A stale (expired) lock is cleared and the count restarts at 1.
/// - During an active lock the state is left untouched: the lock is not
///   extended and the counter stays clamped at the threshold.
/// - Otherwise the counter increments, and reaching the threshold sets
///   `lock_until = now + lock_duration`.
#[must_use]
pub fn apply_failure(
    login_attempts: i32,
    lock_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    policy: &LockoutPolicy,
) -> LockoutState {
    match lock_until {
        Some(until) if until > now => LockoutState {
            login_attempts,
            lock_until: Some(until),
        },
        Some(_) => LockoutState {
            login_attempts: 1,
            lock_until: None,
        },
        None => {
            let next = login_attempts.saturating_add(1);
            if next >= policy.max_attempts() {
                LockoutState {
                    login_attempts: policy.max_attempts(),
                    lock_until: Some(now + policy.lock_duration()),
                }
            } else {
                LockoutState {
                    login_attempts: next,
                    lock_until: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::default()
    }

    #[test]
    fn five_failures_lock_the_account() {
        let now = Utc::now();
        let mut state = LockoutState {
            login_attempts: 0,
            lock_until: None,
        };
        for expected in 1..=4 {
            state = apply_failure(state.login_attempts, state.lock_until, now, &policy());
            assert_eq!(state.login_attempts, expected);
            assert_eq!(state.lock_until, None);
        }
        state = apply_failure(state.login_attempts, state.lock_until, now, &policy());
        assert_eq!(state.login_attempts, 5);
        assert_eq!(state.lock_until, Some(now + Duration::seconds(30 * 60)));
        assert!(is_locked(state.lock_until, now));
    }

    #[test]
    fn lockout_does_not_extend_during_active_lock() {
        // Chosen answer to the over-threshold question: failures while the
        // lock is active neither extend it nor grow the counter.
        let now = Utc::now();
        let locked_until = now + Duration::minutes(30);
        let state = apply_failure(5, Some(locked_until), now + Duration::minutes(1), &policy());
        assert_eq!(state.login_attempts, 5);
        assert_eq!(state.lock_until, Some(locked_until));
    }

    #[test]
    fn stale_lock_restarts_the_count() {
        let now = Utc::now();
        let expired = now - Duration::seconds(1);
        let state = apply_failure(5, Some(expired), now, &policy());
        assert_eq!(state.login_attempts, 1);
        assert_eq!(state.lock_until, None);
        assert!(!is_locked(state.lock_until, now));
    }

    #[test]
    fn lock_status_is_derived_from_now() {
        let now = Utc::now();
        let until = now + Duration::seconds(10);
        assert!(is_locked(Some(until), now));
        assert!(!is_locked(Some(until), now + Duration::seconds(10)));
        assert!(!is_locked(Some(until), now + Duration::seconds(11)));
        assert!(!is_locked(None, now));
    }

    #[test]
    fn retry_after_rounds_up() {
        let now = Utc::now();
        let until = now + Duration::milliseconds(1500);
        assert_eq!(retry_after_seconds(Some(until), now), Some(2));
        assert_eq!(retry_after_seconds(Some(now), now), None);
        assert_eq!(retry_after_seconds(None, now), None);
    }

    #[test]
    fn threshold_respects_configured_policy() {
        let now = Utc::now();
        let policy = LockoutPolicy::new(2, 60);
        let first = apply_failure(0, None, now, &policy);
        assert_eq!(first.lock_until, None);
        let second = apply_failure(first.login_attempts, first.lock_until, now, &policy);
        assert_eq!(second.login_attempts, 2);
        assert_eq!(second.lock_until, Some(now + Duration::seconds(60)));
    }
}
