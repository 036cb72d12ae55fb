//! # ArtAsset (OTP login and art generation API)
//!
//! `artasset` is the backend for the ArtAsset AI art generator demo. Users
//! sign in with a one-time passcode sent to their email and then upload an
//! image and/or a video to receive a generated artwork.
//!
//! ## Authentication (email OTP)
//!
//! `POST /auth/send-otp` issues a 6-digit code that lives for two minutes and
//! queues it on the email outbox; the code is never echoed back to the
//! caller. `POST /auth/verify-otp` consumes the code and returns an opaque
//! bearer token. Only the SHA-256 hash of the token is kept server-side.
//!
//! All state lives in process memory: a restart drops pending codes and
//! sessions.
//!
//! ## Art generation
//!
//! `POST /api/generate-art` requires a bearer token and accepts a multipart
//! form. The shipped provider returns a placeholder image URL.

pub mod api;
pub mod art;
pub mod cli;
pub mod otp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
