use crate::{
    api::{
        self, ArtState, AuthConfig, AuthState,
        email::{self, EmailWorkerConfig},
        handlers::auth::{NoopRateLimiter, RateLimiter, WindowRateLimiter},
    },
    art::PlaceholderArtProvider,
    otp::{OtpConfig, OtpService},
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub rate_limit_per_minute: u32,
    pub email_outbox_max_attempts: u32,
    pub email_outbox_backoff_base_seconds: u64,
    pub email_outbox_backoff_max_seconds: u64,
    pub art_max_upload_bytes: usize,
    pub art_placeholder_base_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(?args, "server configuration");

    let email_config = EmailWorkerConfig::new()
        .with_max_attempts(args.email_outbox_max_attempts)
        .with_backoff_base_seconds(args.email_outbox_backoff_base_seconds)
        .with_backoff_max_seconds(args.email_outbox_backoff_max_seconds);

    // Background worker drains the in-memory outbox and retries failures with backoff.
    let (outbox, _outbox_worker) =
        email::spawn_outbox_worker(Arc::new(email::LogEmailSender), email_config);

    let otp_config = OtpConfig::new()
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds);
    let otp = Arc::new(OtpService::new(otp_config, Arc::new(outbox)));

    let rate_limiter: Arc<dyn RateLimiter> = if args.rate_limit_per_minute == 0 {
        Arc::new(NoopRateLimiter)
    } else {
        info!(
            limit = args.rate_limit_per_minute,
            "OTP rate limiting enabled"
        );
        Arc::new(WindowRateLimiter::new(args.rate_limit_per_minute))
    };

    let auth_state = Arc::new(AuthState::new(
        AuthConfig::new(args.frontend_base_url),
        otp,
        rate_limiter,
    ));

    let provider = PlaceholderArtProvider::new(&args.art_placeholder_base_url)?;
    let art_state = Arc::new(ArtState::new(
        Arc::new(provider),
        args.art_max_upload_bytes,
    ));

    api::new(args.port, auth_state, art_state).await
}
