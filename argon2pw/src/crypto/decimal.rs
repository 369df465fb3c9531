//! Overflow-checked decimal parsing for the numeric fields of an encoded hash.
//! Every number read out of an untrusted hash string goes through
//! [`parse_u32`], so there is exactly one place where digits become integers.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("empty numeric field")]
    EmptyInput,
    #[error("numeric field contains a non-digit byte")]
    InvalidDigit,
    #[error("numeric field overflows a 32-bit unsigned integer")]
    IntegerOverflow,
}

/// Parses an unsigned decimal number made only of ASCII digits.
///
/// Signs, whitespace and separators are rejected. The accumulator is checked
/// before every multiply and add, so an oversized value fails with
/// [`DecimalError::IntegerOverflow`] instead of wrapping.
pub fn parse_u32(bytes: &[u8]) -> Result<u32, DecimalError> {
    if bytes.is_empty() {
        return Err(DecimalError::EmptyInput);
    }

    let mut value: u32 = 0;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(DecimalError::InvalidDigit);
        }
        let digit = u32::from(byte - b'0');

        if value > u32::MAX / 10 {
            return Err(DecimalError::IntegerOverflow);
        }
        value *= 10;

        if value > u32::MAX - digit {
            return Err(DecimalError::IntegerOverflow);
        }
        value += digit;
    }

    Ok(value)
}
