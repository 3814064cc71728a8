//! Error taxonomy for the beacon subsystem.
//!
//! | Error | Meaning | Who sees it |
//! |-------|---------|-------------|
//! | [`SignerError`] | token corrupted, tampered, or unparseable | contained inside [`CookieStore`](crate::cookies::CookieStore) |
//! | [`CookieError::NotFound`] | cookie absent (or corrupted and removed) | [`VisitorIdentity`](crate::identity::VisitorIdentity) |
//! | [`CookieError::Signing`], [`CookieError::ExpiryOutOfRange`] | a write could not be queued | request handlers |
//! | [`ConfigError`] | required configuration missing or invalid | startup code, fatal |

/// Failure to verify a signed token.
///
/// Every variant is an integrity failure: the token must not be trusted.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token signature does not match payload")]
    Integrity,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failures of the signed cookie store.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// Absent, or present but corrupted and already discarded.
    #[error("Cookie '{0}' is not set")]
    NotFound(String),

    #[error("Cookie signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Cookie '{0}' expiry is out of range")]
    ExpiryOutOfRange(String),
}

/// Configuration problems detected at initialization.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
