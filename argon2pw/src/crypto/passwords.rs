//! Argon2id password hashing and verification.
//! Hashing resolves parameters, draws a salt, derives the digest and encodes
//! everything into a PHC string. Verification decodes that string, re-derives
//! with the embedded parameters and compares digests in constant time.

use argon2::{Algorithm, Argon2, Params, Version};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::{
    Config, ConfigError, HashParameters, Runtime, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_MEMORY_KIB,
};
use crate::crypto::phc;
use crate::crypto::random::SecureRandom;
use crate::error::PasswordError;

/// Hashes with a fixed set of validated parameters and verifies hashes made
/// with any parameters inside the decoder's ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    runtime: Runtime,
    params: HashParameters,
}

impl PasswordHasher {
    /// Hasher using the compiled-in defaults.
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            params: HashParameters::defaults(&runtime),
        }
    }

    /// Hasher using `config`, validated against `runtime`. Raised ceilings
    /// still cannot take the parameters past what [`phc::decode`] accepts.
    pub fn with_config(runtime: Runtime, config: &Config) -> Result<Self, PasswordError> {
        let params = resolve(config, &runtime)?;
        Ok(Self { runtime, params })
    }

    pub fn params(&self) -> &HashParameters {
        &self.params
    }

    /// Hashes `password` with a fresh random salt.
    pub fn hash(&self, password: impl AsRef<[u8]>) -> Result<String, PasswordError> {
        hash_with_params(password.as_ref(), &self.params)
    }

    /// Hashes with `config` when given, otherwise with this hasher's parameters.
    pub fn hash_with(&self, password: impl AsRef<[u8]>, config: Option<&Config>) -> Result<String, PasswordError> {
        let password = password.as_ref();
        if password.is_empty() {
            return Err(PasswordError::EmptyPassword);
        }
        match config {
            Some(config) => hash_with_params(password, &resolve(config, &self.runtime)?),
            None => hash_with_params(password, &self.params),
        }
    }

    /// Checks `password` against an encoded hash.
    ///
    /// Returns `Ok(false)` on a mismatch. A hash that cannot be decoded or
    /// re-derived is an error, never a mismatch.
    pub fn verify(&self, password: impl AsRef<[u8]>, encoded: impl AsRef<[u8]>) -> Result<bool, PasswordError> {
        let password = password.as_ref();
        let encoded = encoded.as_ref();
        if password.is_empty() {
            return Err(PasswordError::EmptyPassword);
        }
        if encoded.is_empty() {
            return Err(PasswordError::NilHash);
        }

        let decoded = phc::decode(encoded).map_err(|err| {
            tracing::debug!(error = %err, "rejecting malformed password hash");
            err
        })?;

        let key_length = u32::try_from(decoded.digest.len()).map_err(|_| PasswordError::HashTooLarge)?;
        let params = HashParameters {
            memory_kib: decoded.memory_kib,
            iterations: decoded.iterations,
            parallelism: decoded.parallelism,
            key_length,
            salt_length: decoded.salt.len() as u32,
        };
        let computed = derive(password, &decoded.salt, &params)?;

        Ok(digests_match(&decoded.digest, &computed))
    }

    /// True when `encoded` decodes but was produced with parameters other
    /// than this hasher's, so it should be re-hashed after a successful login.
    pub fn needs_rehash(&self, encoded: impl AsRef<[u8]>) -> Result<bool, PasswordError> {
        let decoded = phc::decode(encoded)?;
        let current = &self.params;
        Ok(decoded.memory_kib != current.memory_kib
            || decoded.iterations != current.iterations
            || decoded.parallelism != current.parallelism
            || decoded.salt.len() as u64 != u64::from(current.salt_length)
            || decoded.digest.len() as u64 != u64::from(current.key_length))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(*Runtime::global())
    }
}

/// Validates `config` and keeps the result verifiable: a hash is only
/// produced with memory and iterations the decoder will accept.
fn resolve(config: &Config, runtime: &Runtime) -> Result<HashParameters, ConfigError> {
    let params = config.validate(runtime)?;
    if params.memory_kib > DEFAULT_MAX_MEMORY_KIB {
        return Err(ConfigError::MemoryExceedsMax {
            memory_kib: params.memory_kib,
            max_memory_kib: DEFAULT_MAX_MEMORY_KIB,
        });
    }
    if params.iterations > DEFAULT_MAX_ITERATIONS {
        return Err(ConfigError::IterationsExceedsMax {
            iterations: params.iterations,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        });
    }
    Ok(params)
}

fn hash_with_params(password: &[u8], params: &HashParameters) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::EmptyPassword);
    }
    tracing::debug!(
        memory_kib = params.memory_kib,
        iterations = params.iterations,
        parallelism = params.parallelism,
        "hashing password"
    );

    let salt = SecureRandom::new().random_bytes(params.salt_length as usize)?;
    let digest = derive(password, &salt, params)?;

    Ok(phc::encode(&digest, &salt, params.memory_kib, params.iterations, params.parallelism))
}

fn argon2_config(params: &HashParameters) -> Result<Argon2<'static>, argon2::Error> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        u32::from(params.parallelism),
        Some(params.key_length as usize),
    )?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params))
}

/// Runs Argon2id. Inputs the primitive refuses (empty password or salt, too
/// little memory for the lanes, zero passes, short output) yield
/// [`PasswordError::InvalidHash`].
fn derive(password: &[u8], salt: &[u8], params: &HashParameters) -> Result<Zeroizing<Vec<u8>>, PasswordError> {
    if password.is_empty() || salt.is_empty() {
        return Err(PasswordError::InvalidHash);
    }

    let mut output = Zeroizing::new(vec![0u8; params.key_length as usize]);
    argon2_config(params)
        .and_then(|argon2| argon2.hash_password_into(password, salt, &mut output))
        .map_err(|err| {
            tracing::debug!(error = %err, "argon2 rejected derivation inputs");
            PasswordError::InvalidHash
        })?;
    Ok(output)
}

/// Full-length comparison; running time depends only on the lengths.
fn digests_match(expected: &[u8], computed: &[u8]) -> bool {
    expected.ct_eq(computed).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::phc::FormatError;

    fn cheap() -> PasswordHasher {
        let config = Config {
            memory_kib: Some(1024),
            iterations: Some(1),
            parallelism: Some(1),
            ..Config::default()
        };
        PasswordHasher::with_config(Runtime::with_available_parallelism(4), &config)
            .expect("cheap config is valid")
    }

    #[test]
    fn hashes_and_verifies_passwords() {
        let hasher = cheap();
        let hash = hasher.hash("hasher-test-password").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert!(hasher.verify("hasher-test-password", &hash).expect("verify should succeed"));
        assert!(!hasher.verify("wrong-password", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verifies_with_embedded_parameters() {
        let hash = cheap().hash(b"bytes-password").unwrap();
        let other = PasswordHasher::new(Runtime::with_available_parallelism(1));
        assert!(other.verify(b"bytes-password", &hash).unwrap());
    }

    #[test]
    fn honours_lengths_from_config() {
        let config = Config {
            memory_kib: Some(256),
            iterations: Some(1),
            parallelism: Some(1),
            salt_length: Some(24),
            key_length: Some(48),
            ..Config::default()
        };
        let hash = cheap().hash_with("pw", Some(&config)).unwrap();
        let decoded = phc::decode(&hash).unwrap();
        assert_eq!(decoded.salt.len(), 24);
        assert_eq!(decoded.digest.len(), 48);
        assert!(cheap().verify("pw", &hash).unwrap());
    }

    #[test]
    fn hash_with_none_uses_own_parameters() {
        let hash = cheap().hash_with("pw", None).unwrap();
        assert!(hash.contains("$m=1024,t=1,p=1$"));
    }

    #[test]
    fn hash_with_rejects_bad_config() {
        let config = Config {
            iterations: Some(50),
            ..Config::default()
        };
        let err = cheap().hash_with("pw", Some(&config)).unwrap_err();
        assert!(err.is_config_error());
        assert!(matches!(err, PasswordError::Config(ConfigError::IterationsExceedsMax { .. })));
    }

    #[test]
    fn raised_ceilings_cannot_outgrow_verification() {
        let hasher = cheap();
        let config = Config {
            memory_kib: Some(512),
            iterations: Some(12),
            max_iterations: Some(20),
            parallelism: Some(1),
            ..Config::default()
        };
        let err = hasher.hash_with("pw", Some(&config)).unwrap_err();
        assert!(matches!(
            err,
            PasswordError::Config(ConfigError::IterationsExceedsMax { iterations: 12, max_iterations: 10 })
        ));
        assert!(PasswordHasher::with_config(Runtime::with_available_parallelism(4), &config).is_err());

        let config = Config {
            memory_kib: Some(600_000),
            max_memory_kib: Some(1_000_000),
            ..Config::default()
        };
        assert!(matches!(
            hasher.hash_with("pw", Some(&config)),
            Err(PasswordError::Config(ConfigError::MemoryExceedsMax { memory_kib: 600_000, max_memory_kib: 524_288 }))
        ));
    }

    #[test]
    fn hashes_at_iteration_ceiling_verify() {
        let config = Config {
            memory_kib: Some(64),
            iterations: Some(10),
            max_iterations: Some(20),
            parallelism: Some(1),
            ..Config::default()
        };
        let hasher = PasswordHasher::with_config(Runtime::with_available_parallelism(4), &config)
            .expect("iterations at the decoder ceiling are accepted");
        let hash = hasher.hash("pw").expect("hashing should succeed");
        assert!(hash.contains("$m=64,t=10,p=1$"));
        assert!(hasher.verify("pw", &hash).expect("verify should succeed"));
    }

    #[test]
    fn rejects_empty_inputs() {
        let hasher = cheap();
        assert!(matches!(hasher.hash(""), Err(PasswordError::EmptyPassword)));
        assert!(matches!(hasher.hash_with("", None), Err(PasswordError::EmptyPassword)));
        let hash = hasher.hash("pw").unwrap();
        assert!(matches!(hasher.verify("", &hash), Err(PasswordError::EmptyPassword)));
        assert!(matches!(hasher.verify("pw", ""), Err(PasswordError::NilHash)));
        assert!(matches!(hasher.verify("", ""), Err(PasswordError::EmptyPassword)));
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        let hasher = cheap();
        let err = hasher.verify("pw", "$argon2i$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA").unwrap_err();
        assert!(err.is_format_error());
        assert!(matches!(err, PasswordError::Format(FormatError::UnsupportedAlgorithm)));

        let err = hasher.verify("pw", "$argon2id$v=19$m=9999999,t=1,p=1$c2FsdHNhbHQ$aGFzaA").unwrap_err();
        assert!(matches!(err, PasswordError::Format(FormatError::InvalidParams)));
    }

    #[test]
    fn underivable_hash_is_invalid() {
        let hasher = cheap();
        // salt shorter than argon2's minimum
        let err = hasher.verify("pw", "$argon2id$v=19$m=65536,t=3,p=4$c2FsdA$aGFzaA").unwrap_err();
        assert!(matches!(err, PasswordError::InvalidHash));
        // zero passes
        let err = hasher.verify("pw", "$argon2id$v=19$m=1024,t=0,p=1$c2FsdHNhbHQ$aGFzaGhhc2g").unwrap_err();
        assert!(matches!(err, PasswordError::InvalidHash));
        // empty digest
        let err = hasher.verify("pw", "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$").unwrap_err();
        assert!(matches!(err, PasswordError::InvalidHash));
    }

    #[test]
    fn tampered_digest_does_not_match() {
        let hasher = cheap();
        let hash = hasher.hash("pw").unwrap();
        let mut decoded = phc::decode(&hash).unwrap();
        decoded.digest[0] ^= 1;
        let tampered = phc::encode(&decoded.digest, &decoded.salt, 1024, 1, 1);
        assert!(!hasher.verify("pw", &tampered).unwrap());
    }

    #[test]
    fn comparison_inspects_every_byte() {
        let expected = [0xAAu8; 32];
        let mut first = expected;
        first[0] ^= 0xFF;
        let mut last = expected;
        last[31] ^= 0x01;

        assert!(digests_match(&expected, &expected));
        assert!(!digests_match(&expected, &first));
        assert!(!digests_match(&expected, &last));
        assert!(!digests_match(&expected, &expected[..31]));
    }

    #[test]
    fn needs_rehash_tracks_parameter_changes() {
        let hasher = cheap();
        let hash = hasher.hash("pw").unwrap();
        assert!(!hasher.needs_rehash(&hash).unwrap());

        let stronger = PasswordHasher::with_config(
            Runtime::with_available_parallelism(4),
            &Config {
                memory_kib: Some(2048),
                iterations: Some(1),
                parallelism: Some(1),
                ..Config::default()
            },
        )
        .unwrap();
        assert!(stronger.needs_rehash(&hash).unwrap());
        assert!(hasher.needs_rehash("$argon2id$v=19$m=1").is_err());
    }
}
