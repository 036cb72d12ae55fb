//! Auth handlers and supporting modules.
//!
//! Login is passwordless: `send-otp` mails a 6-digit code, `verify-otp`
//! exchanges it for a bearer token. Protected endpoints resolve the token via
//! [`session::authenticate_request`].
//!
//! ## Rate Limiting
//!
//! Both OTP endpoints consult a [`RateLimiter`] per client IP and per email
//! before touching the code store. The default limiter allows everything; a
//! fixed one-minute window limiter is enabled with
//! `--rate-limit-per-minute`.

pub mod otp;
mod rate_limit;
pub mod session;
mod state;
pub mod types;
mod utils;

pub use rate_limit::{
    NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimiter, WindowRateLimiter,
};
pub use state::{AuthConfig, AuthState};
pub(crate) use utils::normalize_email;

#[cfg(test)]
mod tests;
