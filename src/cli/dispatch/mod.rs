//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action to run, currently only the API
//! server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{art, auth};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let auth_opts = auth::Options::parse(matches)?;
    let art_opts = art::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        frontend_base_url: auth_opts.frontend_base_url,
        otp_ttl_seconds: auth_opts.otp_ttl_seconds,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        rate_limit_per_minute: auth_opts.rate_limit_per_minute,
        email_outbox_max_attempts: auth_opts.email_outbox.max_attempts,
        email_outbox_backoff_base_seconds: auth_opts.email_outbox.backoff_base_seconds,
        email_outbox_backoff_max_seconds: auth_opts.email_outbox.backoff_max_seconds,
        art_max_upload_bytes: art_opts.max_upload_bytes,
        art_placeholder_base_url: art_opts.placeholder_base_url,
    }))
}
