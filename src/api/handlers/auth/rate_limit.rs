//! Rate limiting primitives for auth flows.
//!
//! `WindowRateLimiter` keeps fixed one-minute windows in memory, keyed by
//! action plus IP or email. Limits are per process.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    SendOtp,
    VerifyOtp,
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

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Subject {
    Ip(String),
    Email(String),
}

#[derive(Clone, Copy, Debug)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Allows `limit` attempts per subject and action in each one-minute window.
#[derive(Debug)]
pub struct WindowRateLimiter {
    limit: u32,
    windows: Mutex<HashMap<(RateLimitAction, Subject), Window>>,
}

impl WindowRateLimiter {
    #[must_use]
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            limit: limit_per_minute.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn hit(&self, action: RateLimitAction, subject: Subject, now: Instant) -> RateLimitDecision {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows.retain(|_, window| now.duration_since(window.started) < WINDOW);

        let window = windows.entry((action, subject)).or_insert(Window {
            started: now,
            hits: 0,
        });
        if window.hits >= self.limit {
            return RateLimitDecision::Limited;
        }
        window.hits += 1;
        RateLimitDecision::Allowed
    }
}

impl RateLimiter for WindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        // Requests without a resolvable client IP are only limited per email.
        let Some(ip) = ip else {
            return RateLimitDecision::Allowed;
        };
        self.hit(action, Subject::Ip(ip.to_string()), Instant::now())
    }

    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision {
        self.hit(action, Subject::Email(email.to_string()), Instant::now())
    }
}
