//! PHC string codec for Argon2id hashes.
//!
//! The only accepted shape is
//! `$argon2id$v=19$m=<memory>,t=<iterations>,p=<parallelism>$<salt>$<digest>`
//! with salt and digest in unpadded standard base64. Decoding treats the input
//! as hostile: structure is checked before any number is parsed, numbers go
//! through the overflow-checked [`parse_u32`], and memory and iteration counts
//! are bounded so a crafted string cannot make verification arbitrarily
//! expensive.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use thiserror::Error;

use crate::config::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_MEMORY_KIB};
use crate::crypto::decimal::{parse_u32, DecimalError};

/// Algorithm identifier written into every encoded hash.
pub const ALGORITHM: &str = "argon2id";
/// Argon2 version number (0x13) written into every encoded hash.
pub const VERSION: u32 = 0x13;

const FIELD_COUNT: usize = 6;
const DELIMITER: u8 = b'$';
const VERSION_PREFIX: &[u8] = b"v=";
const MEMORY_PREFIX: &[u8] = b"m=";
const ITERATIONS_SEPARATOR: &[u8] = b",t=";
const PARALLELISM_SEPARATOR: &[u8] = b",p=";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid hash format: expected 6 '$'-separated fields")]
    InvalidFormat,
    #[error("unsupported algorithm; only argon2id is accepted")]
    UnsupportedAlgorithm,
    #[error("invalid argon2 version; only v=19 is accepted")]
    InvalidVersion,
    #[error("invalid parameters in hash")]
    InvalidParams,
    #[error("invalid number in '{field}' field: {source}")]
    Number {
        field: &'static str,
        #[source]
        source: DecimalError,
    },
    #[error("base64 decoding of {field} failed: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },
}

/// Components recovered from an encoded hash. Key length and salt length are
/// implied by the lengths of `digest` and `salt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHash {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u8,
    pub salt: Vec<u8>,
    pub digest: Vec<u8>,
}

/// Serializes a digest and its parameters into the PHC string form.
/// Inputs are trusted; the caller validates them beforehand.
pub fn encode(digest: &[u8], salt: &[u8], memory_kib: u32, iterations: u32, parallelism: u8) -> String {
    format!(
        "${ALGORITHM}$v={VERSION}$m={memory_kib},t={iterations},p={parallelism}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(digest),
    )
}

/// Parses an encoded hash, rejecting anything that does not match the exact
/// grammar or that asks for more memory or iterations than the compiled-in
/// ceilings allow.
pub fn decode(encoded: impl AsRef<[u8]>) -> Result<DecodedHash, FormatError> {
    let fields: Vec<&[u8]> = encoded.as_ref().split(|&b| b == DELIMITER).collect();
    if fields.len() != FIELD_COUNT || !fields[0].is_empty() {
        return Err(FormatError::InvalidFormat);
    }

    if fields[1] != ALGORITHM.as_bytes() {
        return Err(FormatError::UnsupportedAlgorithm);
    }

    let version = fields[2]
        .strip_prefix(VERSION_PREFIX)
        .filter(|digits| !digits.is_empty())
        .ok_or(FormatError::InvalidVersion)?;
    let version = parse_u32(version).map_err(|source| FormatError::Number { field: "v", source })?;
    if version != VERSION {
        return Err(FormatError::InvalidVersion);
    }

    let (memory_kib, iterations, parallelism) = decode_params(fields[3])?;

    if memory_kib > DEFAULT_MAX_MEMORY_KIB || iterations > DEFAULT_MAX_ITERATIONS {
        tracing::debug!(memory_kib, iterations, "encoded hash exceeds resource ceilings");
        return Err(FormatError::InvalidParams);
    }

    let salt = STANDARD_NO_PAD
        .decode(fields[4])
        .map_err(|source| FormatError::Base64 { field: "salt", source })?;
    let digest = STANDARD_NO_PAD
        .decode(fields[5])
        .map_err(|source| FormatError::Base64 { field: "digest", source })?;

    Ok(DecodedHash {
        memory_kib,
        iterations,
        parallelism,
        salt,
        digest,
    })
}

/// Splits `m=<u32>,t=<u32>,p=<u8>`. Separator positions are checked before
/// any digits are read.
fn decode_params(params: &[u8]) -> Result<(u32, u32, u8), FormatError> {
    let t_pos = find(params, ITERATIONS_SEPARATOR);
    let p_pos = find(params, PARALLELISM_SEPARATOR);

    let (t_pos, p_pos) = match (t_pos, p_pos) {
        (Some(t), Some(p)) if params.starts_with(MEMORY_PREFIX) && t >= 3 && p >= t + 3 => (t, p),
        _ => return Err(FormatError::InvalidParams),
    };

    let memory = &params[MEMORY_PREFIX.len()..t_pos];
    let iterations = &params[t_pos + ITERATIONS_SEPARATOR.len()..p_pos];
    let parallelism = &params[p_pos + PARALLELISM_SEPARATOR.len()..];

    let memory = parse_u32(memory).map_err(|source| FormatError::Number { field: "m", source })?;
    let iterations = parse_u32(iterations).map_err(|source| FormatError::Number { field: "t", source })?;
    let parallelism = parse_u32(parallelism).map_err(|source| FormatError::Number { field: "p", source })?;
    let parallelism = u8::try_from(parallelism).map_err(|_| FormatError::InvalidParams)?;

    Ok((memory, iterations, parallelism))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
