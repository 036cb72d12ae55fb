use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// A freshly issued code. Only the delivery seam ever sees `code`.
#[derive(Debug)]
pub struct IssuedOtp {
    pub email: String,
    pub code: SecretString,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedOtp {
    /// Lifetime of the code rounded up to whole minutes, for user-facing copy.
    #[must_use]
    pub fn lifetime_minutes(&self) -> i64 {
        let seconds = (self.expires_at - self.issued_at).num_seconds().max(0);
        (seconds + 59) / 60
    }
}

/// Session minted by a successful verification.
#[derive(Clone)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"***")
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Caller identity resolved from a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}
