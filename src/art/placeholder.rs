use anyhow::{Context, Result};
use tracing::debug;
use ulid::Ulid;
use url::Url;

use super::{ArtProvider, ArtRequest, ArtResult};

pub const DEFAULT_PLACEHOLDER_BASE_URL: &str = "https://picsum.photos/600/400";

/// Returns a random stock photo; video-only requests get a grayscale one.
#[derive(Clone, Debug)]
pub struct PlaceholderArtProvider {
    base_url: Url,
}

impl PlaceholderArtProvider {
    /// # Errors
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid placeholder base URL: {base_url}"))?;
        Ok(Self { base_url })
    }
}

impl ArtProvider for PlaceholderArtProvider {
    fn name(&self) -> &str {
        "Mock Service"
    }

    fn generate(&self, request: &ArtRequest) -> Result<ArtResult> {
        let mut url = self.base_url.clone();
        let random = Ulid::new().to_string();
        let query = if request.is_video_only() {
            format!("grayscale&random={random}")
        } else {
            format!("random={random}")
        };
        url.set_query(Some(&query));

        debug!(art_url = %url, "placeholder art selected");

        Ok(ArtResult {
            art_url: url.to_string(),
            provider: self.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::UploadedFile;

    fn request(image: bool, video: bool) -> ArtRequest {
        let file = |content_type: &str| UploadedFile {
            file_name: "f".to_string(),
            content_type: content_type.to_string(),
            data: vec![1, 2, 3],
        };
        ArtRequest {
            requested_by: "a@b.com".to_string(),
            image: image.then(|| file("image/jpeg")),
            video: video.then(|| file("video/mp4")),
            prompt: None,
        }
    }

    #[test]
    fn image_requests_get_color_placeholder() -> Result<()> {
        let provider = PlaceholderArtProvider::new(DEFAULT_PLACEHOLDER_BASE_URL)?;
        let result = provider.generate(&request(true, false))?;
        assert!(
            result
                .art_url
                .starts_with("https://picsum.photos/600/400?random=")
        );
        assert_eq!(result.provider, "Mock Service");
        Ok(())
    }

    #[test]
    fn video_only_requests_get_grayscale_placeholder() -> Result<()> {
        let provider = PlaceholderArtProvider::new("https://img.example/800/600")?;
        let result = provider.generate(&request(false, true))?;
        assert!(
            result
                .art_url
                .starts_with("https://img.example/800/600?grayscale&random=")
        );
        Ok(())
    }

    #[test]
    fn each_call_returns_a_new_url() -> Result<()> {
        let provider = PlaceholderArtProvider::new(DEFAULT_PLACEHOLDER_BASE_URL)?;
        let first = provider.generate(&request(true, true))?;
        let second = provider.generate(&request(true, true))?;
        assert_ne!(first.art_url, second.art_url);
        Ok(())
    }

    #[test]
    fn rejects_relative_base_url() {
        assert!(PlaceholderArtProvider::new("not a url").is_err());
    }
}
