//! Argon2id password hashing with a strict PHC string codec.
//!
//! ```no_run
//! let hash = argon2pw::hash("correcthorsebatterystaple")?;
//! assert!(argon2pw::verify("correcthorsebatterystaple", &hash)?);
//! # Ok::<(), argon2pw::PasswordError>(())
//! ```
//!
//! Encoded hashes look like `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<digest>`.
//! Decoding rejects anything outside that grammar and any memory or
//! iteration count above the compiled-in ceilings, so stored hashes cannot be
//! used to make verification arbitrarily expensive.

pub mod config;
pub mod crypto;
pub mod error;
pub mod strength;

pub use config::{Config, ConfigError, HashParameters, Runtime};
pub use crypto::passwords::PasswordHasher;
pub use crypto::phc::{decode, encode, DecodedHash, FormatError};
pub use crypto::random::{
    generate_password, generate_password_with_charset, generate_password_with_length, RandomError,
};
pub use error::PasswordError;

/// Hashes `password` with the default parameters.
pub fn hash(password: impl AsRef<[u8]>) -> Result<String, PasswordError> {
    PasswordHasher::default().hash(password)
}

/// Hashes `password` with parameters resolved from `config`.
pub fn hash_with_config(password: impl AsRef<[u8]>, config: &Config) -> Result<String, PasswordError> {
    PasswordHasher::with_config(*Runtime::global(), config)?.hash(password)
}

/// Checks `password` against an encoded hash; see [`PasswordHasher::verify`].
pub fn verify(password: impl AsRef<[u8]>, encoded: impl AsRef<[u8]>) -> Result<bool, PasswordError> {
    PasswordHasher::default().verify(password, encoded)
}

/// Generates a random password and returns it with its default-parameter hash.
pub fn generate_and_hash() -> Result<(String, String), PasswordError> {
    let password = generate_password()?;
    let hash = hash(&password)?;
    Ok((password, hash))
}
