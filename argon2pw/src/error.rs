//! Top-level error returned by hashing, verification and generation.

use thiserror::Error;

use crate::config::ConfigError;
use crate::crypto::phc::FormatError;
use crate::crypto::random::RandomError;

/// Failure of a hash, verify or generate call. A wrong password is not an
/// error: [`crate::verify`] reports it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password cannot be empty")]
    EmptyPassword,
    #[error("hash is empty")]
    NilHash,
    #[error("hash length exceeds supported limit")]
    HashTooLarge,
    #[error("invalid hash")]
    InvalidHash,
    #[error("malformed hash: {0}")]
    Format(#[from] FormatError),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("random generation failed: {0}")]
    Random(#[from] RandomError),
}

impl PasswordError {
    /// True when the supplied configuration was rejected.
    pub fn is_config_error(&self) -> bool {
        matches!(self, PasswordError::Config(_))
    }

    /// True when the encoded hash itself was unusable, as opposed to the
    /// password or the configuration.
    pub fn is_format_error(&self) -> bool {
        matches!(self, PasswordError::Format(_))
    }
}
