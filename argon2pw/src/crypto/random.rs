//! Cryptographically secure randomness for salts and generated passwords.
//!
//! All draws go through [`RngCore::try_fill_bytes`] so a failing entropy
//! source surfaces as [`RandomError::Source`] instead of a panic. Failures are
//! never retried.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use thiserror::Error;

/// Characters used by the password generators unless a charset is supplied.
pub const DEFAULT_CHARSET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_=+[]{}|;:,.<>?/~";
/// Base length of generated passwords.
pub const DEFAULT_PASSWORD_LENGTH: i64 = 32;
/// Generated passwords are up to this many characters longer than the base.
const EXTRA_LENGTH_RANGE: i64 = 5;

#[derive(Debug, Error)]
pub enum RandomError {
    #[error("range bound must not be negative")]
    NegativeRange,
    #[error("length cannot be negative")]
    NegativeLength,
    #[error("length cannot be zero")]
    LengthZero,
    #[error("charset cannot be empty")]
    InvalidCharset,
    #[error("secure random source failed: {0}")]
    Source(#[from] rand::Error),
}

/// Uniform sampling on top of a cryptographically secure byte source.
#[derive(Debug, Clone, Default)]
pub struct SecureRandom<R = OsRng> {
    rng: R,
}

impl SecureRandom<OsRng> {
    pub fn new() -> Self {
        Self { rng: OsRng }
    }
}

impl<R: RngCore + CryptoRng> SecureRandom<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn fill_bytes(&mut self, out: &mut [u8]) -> Result<(), RandomError> {
        self.rng.try_fill_bytes(out)?;
        Ok(())
    }

    pub fn random_bytes(&mut self, length: usize) -> Result<Vec<u8>, RandomError> {
        let mut bytes = vec![0u8; length];
        self.fill_bytes(&mut bytes)?;
        Ok(bytes)
    }

    /// Returns a value uniformly distributed over `[0, n)`. `n == 0` is an
    /// empty range and yields 0.
    pub fn uniform_int(&mut self, n: i64) -> Result<i64, RandomError> {
        match n {
            n if n < 0 => Err(RandomError::NegativeRange),
            0 => Ok(0),
            // below(n) < n <= i64::MAX, so the cast back is lossless
            n => Ok(self.below(n as u64)? as i64),
        }
    }

    /// Rejection sampling: draws below `2^64 mod bound` are discarded so the
    /// accepted range is an exact multiple of `bound`.
    fn below(&mut self, bound: u64) -> Result<u64, RandomError> {
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let mut buf = [0u8; 8];
            self.fill_bytes(&mut buf)?;
            let candidate = u64::from_le_bytes(buf);
            if candidate >= threshold {
                return Ok(candidate % bound);
            }
        }
    }

    /// Draws `length` independent characters from `charset`.
    pub fn random_password(&mut self, charset: &str, length: i64) -> Result<String, RandomError> {
        if charset.is_empty() {
            return Err(RandomError::InvalidCharset);
        }
        if length < 0 {
            return Err(RandomError::NegativeLength);
        }
        if length == 0 {
            return Err(RandomError::LengthZero);
        }

        let chars: Vec<char> = charset.chars().collect();
        let charset_len = chars.len() as i64;
        (0..length)
            .map(|_| self.uniform_int(charset_len).map(|i| chars[i as usize]))
            .collect()
    }

    /// Password from the default charset whose length is picked uniformly
    /// from `[DEFAULT_PASSWORD_LENGTH, DEFAULT_PASSWORD_LENGTH + 4]`.
    pub fn generate_password(&mut self) -> Result<String, RandomError> {
        let extra = self.uniform_int(EXTRA_LENGTH_RANGE)?;
        self.random_password(DEFAULT_CHARSET, DEFAULT_PASSWORD_LENGTH + extra)
    }
}

/// `length` bytes from the operating system.
pub fn random_bytes(length: usize) -> Result<Vec<u8>, RandomError> {
    SecureRandom::new().random_bytes(length)
}

pub fn uniform_int(n: i64) -> Result<i64, RandomError> {
    SecureRandom::new().uniform_int(n)
}

pub fn generate_password() -> Result<String, RandomError> {
    SecureRandom::new().generate_password()
}

pub fn generate_password_with_length(length: i64) -> Result<String, RandomError> {
    SecureRandom::new().random_password(DEFAULT_CHARSET, length)
}

pub fn generate_password_with_charset(charset: &str, length: i64) -> Result<String, RandomError> {
    SecureRandom::new().random_password(charset, length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io;

    /// Entropy source that is always unavailable.
    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!("only the fallible path is used")
        }

        fn next_u64(&mut self) -> u64 {
            unreachable!("only the fallible path is used")
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!("only the fallible path is used")
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(io::Error::new(io::ErrorKind::Other, "entropy exhausted")))
        }
    }

    impl CryptoRng for BrokenRng {}

    #[test]
    fn empty_and_negative_ranges() {
        assert_eq!(uniform_int(0).expect("empty range is allowed"), 0);
        assert!(matches!(uniform_int(-1), Err(RandomError::NegativeRange)));
        assert!(matches!(uniform_int(i64::MIN), Err(RandomError::NegativeRange)));
        assert_eq!(uniform_int(1).unwrap(), 0);
    }

    #[test]
    fn uniform_int_covers_range_evenly() {
        let mut rng = SecureRandom::new();
        let mut counts = [0u32; 10];
        for _ in 0..10_000 {
            let value = rng.uniform_int(10).expect("draw should succeed");
            assert!((0..10).contains(&value));
            counts[value as usize] += 1;
        }
        for (value, &count) in counts.iter().enumerate() {
            assert!((800..=1200).contains(&count), "value {value} drawn {count} times");
        }
    }

    #[test]
    fn handles_large_bounds() {
        let mut rng = SecureRandom::from_rng(StdRng::seed_from_u64(7));
        for _ in 0..1000 {
            let value = rng.uniform_int(i64::MAX).unwrap();
            assert!((0..i64::MAX).contains(&value));
            let value = rng.uniform_int((1 << 62) + 1).unwrap();
            assert!(value <= 1 << 62);
        }
    }

    #[test]
    fn seeded_sources_are_reproducible() {
        let mut a = SecureRandom::from_rng(StdRng::seed_from_u64(42));
        let mut b = SecureRandom::from_rng(StdRng::seed_from_u64(42));
        assert_eq!(a.random_bytes(32).unwrap(), b.random_bytes(32).unwrap());
        assert_eq!(
            a.random_password(DEFAULT_CHARSET, 20).unwrap(),
            b.random_password(DEFAULT_CHARSET, 20).unwrap()
        );
    }

    #[test]
    fn random_bytes_have_requested_length() {
        assert!(random_bytes(0).unwrap().is_empty());
        let a = random_bytes(16).unwrap();
        let b = random_bytes(16).unwrap();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn source_failures_surface() {
        let mut rng = SecureRandom::from_rng(BrokenRng);
        assert!(matches!(rng.random_bytes(16), Err(RandomError::Source(_))));
        assert!(matches!(rng.uniform_int(10), Err(RandomError::Source(_))));
        assert!(matches!(rng.generate_password(), Err(RandomError::Source(_))));
        // empty ranges never touch the source
        assert_eq!(rng.uniform_int(0).unwrap(), 0);
    }

    #[test]
    fn password_shape_is_validated() {
        assert!(matches!(generate_password_with_charset("", 10), Err(RandomError::InvalidCharset)));
        assert!(matches!(generate_password_with_charset("", -1), Err(RandomError::InvalidCharset)));
        assert!(matches!(generate_password_with_charset("ab", -1), Err(RandomError::NegativeLength)));
        assert!(matches!(generate_password_with_charset("ab", 0), Err(RandomError::LengthZero)));
        assert!(matches!(generate_password_with_length(0), Err(RandomError::LengthZero)));
        assert!(matches!(generate_password_with_length(-5), Err(RandomError::NegativeLength)));
    }

    #[test]
    fn passwords_draw_from_charset() {
        let password = generate_password_with_charset("xyz", 64).unwrap();
        assert_eq!(password.len(), 64);
        assert!(password.chars().all(|c| "xyz".contains(c)));

        let password = generate_password_with_charset("åß∂", 10).unwrap();
        assert_eq!(password.chars().count(), 10);
        assert!(password.chars().all(|c| "åß∂".contains(c)));

        let password = generate_password_with_length(12).unwrap();
        assert_eq!(password.len(), 12);
        assert!(password.chars().all(|c| DEFAULT_CHARSET.contains(c)));
    }

    #[test]
    fn generated_password_length_varies_within_bounds() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let password = generate_password().unwrap();
            let len = password.chars().count() as i64;
            assert!((DEFAULT_PASSWORD_LENGTH..DEFAULT_PASSWORD_LENGTH + EXTRA_LENGTH_RANGE).contains(&len));
            assert!(password.chars().all(|c| DEFAULT_CHARSET.contains(c)));
            seen.insert(len);
        }
        assert!(seen.len() > 1);
    }
}
