//! Art generation requests and providers.
//!
//! Only a placeholder provider ships: it returns a random stock photo URL and
//! performs no inference.

mod placeholder;

pub use placeholder::{DEFAULT_PLACEHOLDER_BASE_URL, PlaceholderArtProvider};

use anyhow::Result;

const PROMPT_STYLE_CHARS: usize = 50;
const DEFAULT_PROMPT: &str = "Default artistic transformation";

/// A file received from the upload form.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Clone, Debug)]
pub struct ArtRequest {
    pub requested_by: String,
    pub image: Option<UploadedFile>,
    pub video: Option<UploadedFile>,
    pub prompt: Option<String>,
}

impl ArtRequest {
    #[must_use]
    pub fn is_video_only(&self) -> bool {
        self.image.is_none() && self.video.is_some()
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match (&self.image, &self.video) {
            (Some(_), Some(_)) => "Art generated from image and video!",
            (None, Some(_)) => "Art generated from video!",
            _ => "Art generated from image!",
        }
    }

    /// `Custom: <first 50 chars>...` for prompted requests, `AI Artistic` otherwise.
    #[must_use]
    pub fn style(&self) -> String {
        match self.prompt() {
            Some(prompt) => {
                let head: String = prompt.chars().take(PROMPT_STYLE_CHARS).collect();
                format!("Custom: {head}...")
            }
            None => "AI Artistic".to_string(),
        }
    }

    #[must_use]
    pub fn prompt_used(&self) -> &str {
        self.prompt().unwrap_or(DEFAULT_PROMPT)
    }

    fn prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtResult {
    pub art_url: String,
    pub provider: String,
}

/// Turns an upload into an art URL.
pub trait ArtProvider: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    /// Returns an error if the provider cannot produce a result.
    fn generate(&self, request: &ArtRequest) -> Result<ArtResult>;
}

/// Render a byte count the way the upload form shows it, e.g. `1.50 MB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: usize) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}
