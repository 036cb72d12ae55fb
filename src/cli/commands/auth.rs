use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_OTP_TTL_SECONDS: &str = "otp-ttl-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_RATE_LIMIT_PER_MINUTE: &str = "rate-limit-per-minute";
pub const ARG_EMAIL_OUTBOX_MAX_ATTEMPTS: &str = "email-outbox-max-attempts";
pub const ARG_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS: &str = "email-outbox-backoff-base-seconds";
pub const ARG_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS: &str = "email-outbox-backoff-max-seconds";

#[derive(Debug)]
pub struct EmailOutboxOptions {
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub rate_limit_per_minute: u32,
    pub email_outbox: EmailOutboxOptions,
}

impl Options {
    /// # Errors
    /// Returns an error if required auth arguments are missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            otp_ttl_seconds: matches
                .get_one::<i64>(ARG_OTP_TTL_SECONDS)
                .copied()
                .unwrap_or(120),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(604_800),
            rate_limit_per_minute: matches
                .get_one::<u32>(ARG_RATE_LIMIT_PER_MINUTE)
                .copied()
                .unwrap_or(0),
            email_outbox: EmailOutboxOptions {
                max_attempts: matches
                    .get_one::<u32>(ARG_EMAIL_OUTBOX_MAX_ATTEMPTS)
                    .copied()
                    .unwrap_or(5),
                backoff_base_seconds: matches
                    .get_one::<u64>(ARG_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS)
                    .copied()
                    .unwrap_or(5),
                backoff_max_seconds: matches
                    .get_one::<u64>(ARG_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS)
                    .copied()
                    .unwrap_or(300),
            },
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_auth_otp_args(command);
    with_auth_outbox_args(command)
}

fn with_auth_otp_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL allowed by CORS")
                .env("ARTASSET_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_OTP_TTL_SECONDS)
                .long(ARG_OTP_TTL_SECONDS)
                .help("One-time passcode lifetime in seconds")
                .env("ARTASSET_OTP_TTL_SECONDS")
                .default_value("120")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds (0 keeps sessions until logout)")
                .env("ARTASSET_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(0..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_PER_MINUTE)
                .long(ARG_RATE_LIMIT_PER_MINUTE)
                .help("Max OTP requests per minute per IP and per email (0 disables)")
                .env("ARTASSET_RATE_LIMIT_PER_MINUTE")
                .default_value("0")
                .value_parser(clap::value_parser!(u32)),
        )
}

fn with_auth_outbox_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_EMAIL_OUTBOX_MAX_ATTEMPTS)
                .long(ARG_EMAIL_OUTBOX_MAX_ATTEMPTS)
                .help("Max delivery attempts before an email is dropped")
                .env("ARTASSET_EMAIL_OUTBOX_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS)
                .long(ARG_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS)
                .help("Base delay for email outbox retry backoff")
                .env("ARTASSET_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS)
                .long(ARG_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS)
                .help("Max delay for email outbox retry backoff")
                .env("ARTASSET_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}
