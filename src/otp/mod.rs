//! One-time passcode login.
//!
//! A code is issued per email, lives for a short window (2 minutes by
//! default) and is consumed by the first successful verification. A
//! successful verification is the only way a session comes into existence.
//!
//! Per email the code moves through:
//!
//! ```text
//! NoCode -> Pending (issue) -> Consumed (verify ok)  -> NoCode
//!                           -> Expired  (timeout)    -> NoCode
//!                           -> Pending  (mismatch)
//! ```
//!
//! Re-issuing replaces the pending code (last write wins). Sessions are keyed
//! by the SHA-256 hash of their bearer token and may carry an expiry.

mod clock;
pub mod crypto;
mod error;
pub mod models;
mod repo;
mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{OsSecretSource, SecretSource};
pub use error::{AuthError, ValidationError};
pub use models::{Identity, IssuedOtp, Session};
pub use service::{CodeDelivery, OtpConfig, OtpService};
