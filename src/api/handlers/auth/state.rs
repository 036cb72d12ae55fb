//! Auth state and configuration.

use std::sync::Arc;

use crate::otp::OtpService;

use super::rate_limit::RateLimiter;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self { frontend_base_url }
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }
}

pub struct AuthState {
    config: AuthConfig,
    otp: Arc<OtpService>,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        otp: Arc<OtpService>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            config,
            otp,
            rate_limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn otp(&self) -> &OtpService {
        self.otp.as_ref()
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}
