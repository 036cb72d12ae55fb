use thiserror::Error;

/// Input rejected before it reaches the stores.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Email and OTP are required")]
    MissingCode,
    #[error("Invalid OTP format. Please enter a 6-digit number.")]
    MalformedCode,
}

/// Failure kinds surfaced by the OTP and session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No code was issued for the email, or it was already consumed.
    #[error("OTP not found or already used")]
    NotFound,
    /// The code existed but its window elapsed; it has been purged.
    #[error("OTP has expired")]
    Expired,
    /// Wrong code; the pending code is kept so the caller may retry.
    #[error("Invalid OTP")]
    Mismatch,
    #[error("Invalid or expired session")]
    Unauthenticated,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable identifier for the failure kind.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::Mismatch => "mismatch",
            Self::Unauthenticated => "unauthenticated",
            Self::Internal(_) => "internal",
        }
    }
}
