//! Email outbox worker and delivery abstractions.
//!
//! Issuing a code enqueues an `EmailMessage` on an in-process channel. A
//! background task receives each message and hands it to an `EmailSender`,
//! which decides how to deliver (SMTP, API, etc.) and returns `Ok`/`Err`.
//!
//! ### Retries
//!
//! Failed messages are re-queued with exponential backoff and jitter until a
//! max attempt threshold is reached, then dropped with an error log. Each
//! retry waits on its own task so a backed-off message never delays fresh
//! ones.
//!
//! The default sender for local dev is `LogEmailSender`, which logs and
//! returns `Ok(())`. Retry/backoff settings are configurable via
//! `EmailWorkerConfig`.
use anyhow::{Result, anyhow};
use rand::Rng;
use secrecy::ExposeSecret;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::time::sleep;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::otp::{CodeDelivery, IssuedOtp};

pub const OTP_TEMPLATE: &str = "otp_code";
const OTP_SUBJECT: &str = "Your ArtAsset AI Verification Code";

#[derive(Clone)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub template: String,
    pub payload_json: String,
    pub body: String,
}

impl std::fmt::Debug for EmailMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailMessage")
            .field("to_email", &self.to_email)
            .field("subject", &self.subject)
            .field("template", &self.template)
            .field("payload_json", &"***")
            .field("body", &"***")
            .finish()
    }
}

impl EmailMessage {
    /// Build the verification-code email for an issued code.
    #[must_use]
    pub fn otp_code(otp: &IssuedOtp) -> Self {
        let code = otp.code.expose_secret();
        let minutes = otp.lifetime_minutes();
        let payload = json!({
            "code": code,
            "expires_in_minutes": minutes,
            "expires_at": otp.expires_at.to_rfc3339(),
        });
        let body = format!(
            "ArtAsset AI Generator\n\n\
             Your verification code is: {code}\n\n\
             This code will expire in {minutes} minutes.\n\
             If you didn't request this code, please ignore this email.\n"
        );

        Self {
            to_email: otp.email.clone(),
            subject: OTP_SUBJECT.to_string(),
            template: OTP_TEMPLATE.to_string(),
            payload_json: payload.to_string(),
            body,
        }
    }
}

/// Email delivery abstraction used by the outbox worker.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error to schedule a retry.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs instead of sending real email.
///
/// The payload carries the code, so it is only emitted at debug level.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = %message.template,
            "email outbox send stub"
        );
        debug!(payload = %message.payload_json, "email outbox payload");
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EmailWorkerConfig {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl EmailWorkerConfig {
    /// Default worker config: 5 max attempts and 5s->5m exponential backoff with jitter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff_base_seconds(mut self, seconds: u64) -> Self {
        self.backoff_base = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_backoff_max_seconds(mut self, seconds: u64) -> Self {
        self.backoff_max = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let max_attempts = self.max_attempts.max(1);
        let backoff_base = if self.backoff_base.is_zero() {
            Duration::from_secs(1)
        } else {
            self.backoff_base
        };
        let backoff_max = if self.backoff_max < backoff_base {
            backoff_base
        } else {
            self.backoff_max
        };
        Self {
            max_attempts,
            backoff_base,
            backoff_max,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    #[must_use]
    pub fn backoff_max(&self) -> Duration {
        self.backoff_max
    }
}

impl Default for EmailWorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct QueuedEmail {
    message: EmailMessage,
    attempts: u32,
}

/// Producer side of the outbox. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Outbox {
    tx: UnboundedSender<QueuedEmail>,
}

impl std::fmt::Debug for QueuedEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedEmail")
            .field("message", &self.message)
            .field("attempts", &self.attempts)
            .finish()
    }
}

impl Outbox {
    /// Queue a message for delivery.
    ///
    /// # Errors
    /// Returns an error if the worker has stopped.
    pub fn enqueue(&self, message: EmailMessage) -> Result<()> {
        self.tx
            .send(QueuedEmail {
                message,
                attempts: 0,
            })
            .map_err(|_| anyhow!("email outbox is closed"))
    }
}

impl CodeDelivery for Outbox {
    fn deliver(&self, otp: &IssuedOtp) -> Result<()> {
        self.enqueue(EmailMessage::otp_code(otp))
    }
}

/// Spawn the background task that drains the outbox.
pub fn spawn_outbox_worker(
    sender: Arc<dyn EmailSender>,
    config: EmailWorkerConfig,
) -> (Outbox, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let retry_tx = tx.downgrade();
    let handle = tokio::spawn(run_outbox(rx, retry_tx, sender, config.normalize()));
    (Outbox { tx }, handle)
}

async fn run_outbox(
    mut rx: UnboundedReceiver<QueuedEmail>,
    retry_tx: WeakUnboundedSender<QueuedEmail>,
    sender: Arc<dyn EmailSender>,
    config: EmailWorkerConfig,
) {
    while let Some(queued) = rx.recv().await {
        let span = info_span!(
            "email.send",
            email.template = %queued.message.template,
            email.attempt = queued.attempts + 1
        );
        let result = span.in_scope(|| sender.send(&queued.message));
        handle_send_result(queued, result, &retry_tx, &config);
    }
    debug!("email outbox closed");
}

fn handle_send_result(
    queued: QueuedEmail,
    result: Result<()>,
    retry_tx: &WeakUnboundedSender<QueuedEmail>,
    config: &EmailWorkerConfig,
) {
    let attempts = queued.attempts.saturating_add(1);
    let Err(err) = result else {
        debug!(attempts, "email delivered");
        return;
    };

    if attempts >= config.max_attempts() {
        error!(
            to_email = %queued.message.to_email,
            attempts,
            "email delivery failed permanently: {err}"
        );
        return;
    }

    let delay = backoff_delay(attempts, config.backoff_base(), config.backoff_max());
    warn!(
        attempts,
        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        "email delivery failed, retrying: {err}"
    );

    let retry_tx = retry_tx.clone();
    let retry = QueuedEmail {
        message: queued.message,
        attempts,
    };
    tokio::spawn(
        async move {
            sleep(delay).await;
            if let Some(tx) = retry_tx.upgrade() {
                if tx.send(retry).is_err() {
                    debug!("email outbox closed before retry");
                }
            }
        }
        .instrument(info_span!("email.retry")),
    );
}

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let delay = base.checked_mul(factor).unwrap_or(max);
    let capped = if delay > max { max } else { delay };
    jitter_delay(capped)
}

fn jitter_delay(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use secrecy::SecretString;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn issued(code: &str) -> IssuedOtp {
        let now = Utc::now();
        IssuedOtp {
            email: "a@b.com".to_string(),
            code: SecretString::from(code.to_string()),
            issued_at: now,
            expires_at: now + ChronoDuration::seconds(120),
        }
    }

    struct FlakySender {
        failures_left: AtomicU32,
        calls: AtomicU32,
        delivered: Mutex<Vec<String>>,
    }

    impl FlakySender {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    impl EmailSender for FlakySender {
        fn send(&self, message: &EmailMessage) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(anyhow!("smtp unavailable"));
            }
            if let Ok(mut delivered) = self.delivered.lock() {
                delivered.push(message.to_email.clone());
            }
            Ok(())
        }
    }

    async fn wait_for_calls(sender: &FlakySender, expected: u32) {
        for _ in 0..1_000 {
            if sender.calls.load(Ordering::SeqCst) >= expected {
                return;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }

    #[test]
    fn otp_message_carries_code_and_lifetime() {
        let message = EmailMessage::otp_code(&issued("482913"));
        assert_eq!(message.to_email, "a@b.com");
        assert_eq!(message.template, OTP_TEMPLATE);
        assert_eq!(message.subject, "Your ArtAsset AI Verification Code");
        assert!(message.body.contains("482913"));
        assert!(message.body.contains("expire in 2 minutes"));

        let payload: serde_json::Value =
            serde_json::from_str(&message.payload_json).unwrap_or_default();
        assert_eq!(payload["code"], "482913");
        assert_eq!(payload["expires_in_minutes"], 2);
    }

    #[test]
    fn debug_output_hides_code() {
        let message = EmailMessage::otp_code(&issued("482913"));
        assert!(!format!("{message:?}").contains("482913"));
    }

    #[test]
    fn worker_config_normalizes_zero_values() {
        let config = EmailWorkerConfig::new()
            .with_max_attempts(0)
            .with_backoff_base_seconds(0)
            .with_backoff_max_seconds(0)
            .normalize();
        assert_eq!(config.max_attempts(), 1);
        assert_eq!(config.backoff_base(), Duration::from_secs(1));
        assert_eq!(config.backoff_max(), Duration::from_secs(1));
    }

    #[test]
    fn backoff_is_capped_and_jittered() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(300);
        for attempt in 1..40 {
            let delay = backoff_delay(attempt, base, max);
            assert!(delay <= max);
        }
        let first = backoff_delay(1, base, max);
        assert!(first >= Duration::from_millis(2_500) && first <= base);
        let late = backoff_delay(20, base, max);
        assert!(late >= Duration::from_secs(150));
    }

    #[tokio::test(start_paused = true)]
    async fn outbox_retries_until_delivered() -> Result<()> {
        let sender = Arc::new(FlakySender::new(2));
        let (outbox, _handle) = spawn_outbox_worker(sender.clone(), EmailWorkerConfig::new());

        outbox.deliver(&issued("482913"))?;
        wait_for_calls(&sender, 3).await;

        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
        let delivered = sender
            .delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default();
        assert_eq!(delivered, vec!["a@b.com".to_string()]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn outbox_gives_up_after_max_attempts() -> Result<()> {
        let sender = Arc::new(FlakySender::new(u32::MAX));
        let config = EmailWorkerConfig::new().with_max_attempts(3);
        let (outbox, _handle) = spawn_outbox_worker(sender.clone(), config);

        outbox.deliver(&issued("482913"))?;
        wait_for_calls(&sender, 3).await;
        // Let any stray retry fire.
        sleep(Duration::from_secs(3_600)).await;

        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn enqueue_fails_once_worker_stops() {
        let (outbox, handle) = spawn_outbox_worker(Arc::new(LogEmailSender), EmailWorkerConfig::new());
        handle.abort();
        let _ = handle.await;
        assert!(outbox.deliver(&issued("482913")).is_err());
    }
}
