//! Composition policy for user-chosen passwords.

use serde::Serialize;

pub const MIN_LENGTH: usize = 8;
pub const MAX_LENGTH: usize = 129;

/// Outcome of each policy check for one password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequirements {
    pub has_lowercase: bool,
    pub has_uppercase: bool,
    pub has_number: bool,
    pub has_special: bool,
    pub length: usize,
    pub min_length: usize,
    pub max_length: usize,
}

impl PasswordRequirements {
    pub fn length_ok(&self) -> bool {
        (self.min_length..=self.max_length).contains(&self.length)
    }

    pub fn is_satisfied(&self) -> bool {
        self.length_ok() && self.has_lowercase && self.has_uppercase && self.has_number && self.has_special
    }
}

/// Runs every check. Length is counted in bytes.
pub fn requirements(password: &str) -> PasswordRequirements {
    PasswordRequirements {
        has_lowercase: password.chars().any(|c| c.is_ascii_lowercase()),
        has_uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
        has_number: password.chars().any(|c| c.is_ascii_digit()),
        has_special: password.chars().any(|c| c.is_ascii_punctuation()),
        length: password.len(),
        min_length: MIN_LENGTH,
        max_length: MAX_LENGTH,
    }
}

/// At least 8 and at most 129 bytes, with a lowercase letter, an uppercase
/// letter, a digit and a punctuation character.
pub fn is_valid(password: &str) -> bool {
    requirements(password).is_satisfied()
}
