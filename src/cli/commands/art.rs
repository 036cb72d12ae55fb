use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use crate::art::DEFAULT_PLACEHOLDER_BASE_URL;

pub const ARG_ART_MAX_UPLOAD_BYTES: &str = "art-max-upload-bytes";
pub const ARG_ART_PLACEHOLDER_BASE_URL: &str = "art-placeholder-base-url";

#[derive(Debug)]
pub struct Options {
    pub max_upload_bytes: usize,
    pub placeholder_base_url: String,
}

impl Options {
    /// # Errors
    /// Returns an error if art arguments cannot be read.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            max_upload_bytes: matches
                .get_one::<usize>(ARG_ART_MAX_UPLOAD_BYTES)
                .copied()
                .unwrap_or(5 * 1024 * 1024),
            placeholder_base_url: matches
                .get_one::<String>(ARG_ART_PLACEHOLDER_BASE_URL)
                .cloned()
                .unwrap_or_else(|| DEFAULT_PLACEHOLDER_BASE_URL.to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ART_MAX_UPLOAD_BYTES)
                .long(ARG_ART_MAX_UPLOAD_BYTES)
                .help("Max size in bytes for each uploaded image or video")
                .env("ARTASSET_ART_MAX_UPLOAD_BYTES")
                .default_value("5242880")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_ART_PLACEHOLDER_BASE_URL)
                .long(ARG_ART_PLACEHOLDER_BASE_URL)
                .help("Base URL of the placeholder image service")
                .env("ARTASSET_ART_PLACEHOLDER_BASE_URL")
                .default_value(DEFAULT_PLACEHOLDER_BASE_URL),
        )
}
