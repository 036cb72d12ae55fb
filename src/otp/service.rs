use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    clock::{Clock, SystemClock},
    crypto::{OsSecretSource, SecretSource, hash_session_token},
    error::{AuthError, ValidationError},
    models::{Identity, IssuedOtp, Session},
    repo::{OtpRepo, PendingOtp, SessionRecord, SessionRepo},
};

const DEFAULT_OTP_TTL_SECONDS: i64 = 2 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Out-of-band channel that carries a code to its owner.
pub trait CodeDelivery: Send + Sync {
    /// Hand the code off for delivery. Delivery itself is asynchronous.
    ///
    /// # Errors
    /// Returns an error if the message could not be queued.
    fn deliver(&self, otp: &IssuedOtp) -> Result<()>;
}

#[derive(Clone, Copy, Debug)]
pub struct OtpConfig {
    otp_ttl: Duration,
    session_ttl: Option<Duration>,
}

impl OtpConfig {
    /// Defaults: codes live 2 minutes, sessions 7 days.
    #[must_use]
    pub fn new() -> Self {
        Self {
            otp_ttl: Duration::seconds(DEFAULT_OTP_TTL_SECONDS),
            session_ttl: Some(Duration::seconds(DEFAULT_SESSION_TTL_SECONDS)),
        }
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl = Duration::seconds(seconds.max(1));
        self
    }

    /// A non-positive value disables session expiry.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl = (seconds > 0).then(|| Duration::seconds(seconds));
        self
    }

    #[must_use]
    pub fn otp_ttl(&self) -> Duration {
        self.otp_ttl
    }

    #[must_use]
    pub fn session_ttl(&self) -> Option<Duration> {
        self.session_ttl
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Issues and verifies one-time passcodes and owns the resulting sessions.
pub struct OtpService {
    config: OtpConfig,
    clock: Arc<dyn Clock>,
    secrets: Arc<dyn SecretSource>,
    delivery: Arc<dyn CodeDelivery>,
    pending: OtpRepo,
    sessions: SessionRepo,
}

impl OtpService {
    #[must_use]
    pub fn new(config: OtpConfig, delivery: Arc<dyn CodeDelivery>) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            secrets: Arc::new(OsSecretSource),
            delivery,
            pending: OtpRepo::default(),
            sessions: SessionRepo::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_secret_source(mut self, secrets: Arc<dyn SecretSource>) -> Self {
        self.secrets = secrets;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Generate and store a code for `email`, replacing any pending one.
    ///
    /// # Errors
    /// Returns `Validation` for an empty email and `Internal` if the
    /// randomness source fails.
    pub async fn issue(&self, email: &str) -> Result<IssuedOtp, AuthError> {
        let issued = self.mint(email)?;
        self.store(&issued).await;
        Ok(issued)
    }

    /// Issue a code and hand it to the delivery channel.
    ///
    /// Only the expiry is returned; the code never travels back to the caller.
    /// The new code replaces the pending one only once it has been queued, so
    /// a failed send leaves an earlier code usable.
    ///
    /// # Errors
    /// Returns the `issue` errors, or `Internal` if the code could not be queued.
    #[instrument(skip(self))]
    pub async fn send_code(&self, email: &str) -> Result<DateTime<Utc>, AuthError> {
        let issued = self.mint(email)?;
        self.delivery.deliver(&issued)?;
        self.store(&issued).await;
        info!(expires_at = %issued.expires_at, "one-time code issued");
        Ok(issued.expires_at)
    }

    fn mint(&self, email: &str) -> Result<IssuedOtp, AuthError> {
        if email.is_empty() {
            return Err(ValidationError::MissingEmail.into());
        }

        let code = self.secrets.otp_code()?;
        let issued_at = self.clock.now();

        Ok(IssuedOtp {
            email: email.to_string(),
            code: SecretString::from(code),
            issued_at,
            expires_at: issued_at + self.config.otp_ttl,
        })
    }

    async fn store(&self, issued: &IssuedOtp) {
        self.pending
            .put(
                &issued.email,
                PendingOtp {
                    code: SecretString::from(issued.code.expose_secret().to_string()),
                    expires_at: issued.expires_at,
                },
            )
            .await;
    }

    /// Verify `code` for `email` and open a session on success.
    ///
    /// # Errors
    /// `NotFound` when no code is pending, `Expired` when the window elapsed
    /// (the code is purged), `Mismatch` when the code differs (the code is
    /// kept), `Internal` if a token cannot be generated.
    #[instrument(skip(self, code))]
    pub async fn verify(&self, email: &str, code: &str) -> Result<Session, AuthError> {
        let token = self.secrets.session_token()?;
        let now = self.clock.now();

        self.pending.consume(email, code, now).await?;

        let expires_at = self.config.session_ttl.map(|ttl| now + ttl);
        self.sessions
            .insert(
                hash_session_token(&token),
                SessionRecord {
                    email: email.to_string(),
                    created_at: now,
                    expires_at,
                },
            )
            .await;

        info!("session created");

        Ok(Session {
            token,
            email: email.to_string(),
            created_at: now,
            expires_at,
        })
    }

    /// Resolve a bearer token into the identity that created it.
    ///
    /// # Errors
    /// Returns `Unauthenticated` for unknown, revoked or expired tokens.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let record = self
            .sessions
            .lookup(&hash_session_token(token), self.clock.now())
            .await
            .ok_or(AuthError::Unauthenticated)?;

        Ok(Identity {
            email: record.email,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    /// Delete the session for `token`. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) {
        if self.sessions.remove(&hash_session_token(token)).await {
            debug!("session revoked");
        }
    }

    /// Expiry of the pending code for `email`, if one is stored.
    pub async fn pending_expiry(&self, email: &str) -> Option<DateTime<Utc>> {
        self.pending.expires_at(email).await
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.len().await
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }
}
