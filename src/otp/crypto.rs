//! Randomness and hashing for codes and session tokens.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

const CODE_MIN: u32 = 100_000;
const CODE_SPAN: u32 = 900_000;

/// Source of the secrets minted by the OTP service.
pub trait SecretSource: Send + Sync {
    /// A 6-digit numeric code, uniform over `[100000, 999999]`.
    ///
    /// # Errors
    /// Returns an error if the randomness source fails.
    fn otp_code(&self) -> Result<String>;

    /// An opaque bearer token.
    ///
    /// # Errors
    /// Returns an error if the randomness source fails.
    fn session_token(&self) -> Result<String>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OsSecretSource;

impl SecretSource for OsSecretSource {
    fn otp_code(&self) -> Result<String> {
        generate_otp_code()
    }

    fn session_token(&self) -> Result<String> {
        generate_session_token()
    }
}

/// Draw a code by rejection sampling so every value in range is equally likely.
pub fn generate_otp_code() -> Result<String> {
    // Largest multiple of CODE_SPAN that fits in u32.
    let limit = u32::MAX - (u32::MAX % CODE_SPAN);
    loop {
        let mut bytes = [0u8; 4];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate OTP code")?;
        let value = u32::from_le_bytes(bytes);
        if value < limit {
            return Ok((CODE_MIN + value % CODE_SPAN).to_string());
        }
    }
}

/// Create a new session token.
/// The raw value is only returned to the client; the store is keyed by its hash.
pub fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a session token so raw values never sit in the session map.
#[must_use]
pub fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_codes_are_six_digits_in_range() -> Result<()> {
        for _ in 0..1_000 {
            let code = generate_otp_code()?;
            assert_eq!(code.len(), 6);
            let value: u32 = code.parse()?;
            assert!((100_000..=999_999).contains(&value));
        }
        Ok(())
    }

    #[test]
    fn session_token_decodes_to_32_bytes() {
        let decoded_len = generate_session_token()
            .ok()
            .and_then(|token| Base64UrlUnpadded::decode_vec(&token).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn session_tokens_differ() -> Result<()> {
        assert_ne!(generate_session_token()?, generate_session_token()?);
        Ok(())
    }

    #[test]
    fn hash_session_token_stable() {
        let first = hash_session_token("token");
        let second = hash_session_token("token");
        let different = hash_session_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 32);
    }
}
