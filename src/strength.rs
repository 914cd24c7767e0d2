//! Password strength scoring and strong password generation
//!
//! The score is an additive heuristic, not an entropy estimate. It is
//! advisory; the only enforced policy is [`MIN_PASSWORD_LENGTH`], applied
//! by the file operations.

use crate::error::{LockerError, Result};
use crate::random::SecureRandom;
use std::fmt;

/// Minimum password length the encryption flows accept.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Default length of generated passwords.
pub const DEFAULT_GENERATED_LENGTH: usize = 20;

/// Highest score a password can reach.
pub const MAX_SCORE: u8 = 5;

const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()_+-=[]{}|;:,.<>?";

pub const HINT_LENGTH: &str = "Use at least 12 characters";
pub const HINT_LOWERCASE: &str = "Add lowercase letters";
pub const HINT_UPPERCASE: &str = "Add uppercase letters";
pub const HINT_DIGITS: &str = "Add numbers";
pub const HINT_SPECIAL: &str = "Add special characters";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthLabel {
    VeryWeak,
    Weak,
    Fair,
    Good,
    Strong,
}

impl fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StrengthLabel::VeryWeak => "Very Weak",
            StrengthLabel::Weak => "Weak",
            StrengthLabel::Fair => "Fair",
            StrengthLabel::Good => "Good",
            StrengthLabel::Strong => "Strong",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthReport {
    /// Score in `0..=MAX_SCORE`.
    pub score: u8,
    /// Improvement hints, in a fixed order.
    pub feedback: Vec<&'static str>,
}

impl StrengthReport {
    pub fn label(&self) -> StrengthLabel {
        match self.score {
            0 | 1 => StrengthLabel::VeryWeak,
            2 => StrengthLabel::Weak,
            3 => StrengthLabel::Fair,
            4 => StrengthLabel::Good,
            _ => StrengthLabel::Strong,
        }
    }
}

/// Score `password` and list what would improve it.
///
/// Length is counted in Unicode scalar values, so a character outside the
/// Basic Multilingual Plane (e.g. an emoji) counts once, not as two UTF-16
/// units.
pub fn score(password: &str) -> StrengthReport {
    let length = password.chars().count();
    let mut feedback = Vec::new();
    let mut points: u8 = 0;

    if length >= MIN_PASSWORD_LENGTH {
        points += 2;
    } else {
        feedback.push(HINT_LENGTH);
    }
    if length >= 16 {
        points += 1;
    }
    if length >= 20 {
        points += 1;
    }

    let classes: [(fn(&char) -> bool, &'static str); 4] = [
        (char::is_ascii_lowercase, HINT_LOWERCASE),
        (char::is_ascii_uppercase, HINT_UPPERCASE),
        (char::is_ascii_digit, HINT_DIGITS),
        (|c: &char| !c.is_ascii_alphanumeric(), HINT_SPECIAL),
    ];
    for (in_class, hint) in classes {
        if password.chars().any(|c| in_class(&c)) {
            points += 1;
        } else {
            feedback.push(hint);
        }
    }

    StrengthReport {
        score: points.min(MAX_SCORE),
        feedback,
    }
}

/// True if `password` satisfies the minimum length policy.
pub fn meets_minimum_length(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Generate a random password of `length` characters.
///
/// Each character is drawn uniformly from a fixed 88-character set. Bytes
/// that would bias the draw are rejected and redrawn.
pub fn generate_strong_password<R: SecureRandom>(rng: &R, length: usize) -> Result<String> {
    if length == 0 {
        return Err(LockerError::invalid_parameters(
            "password length must be at least 1",
        ));
    }

    let n = PASSWORD_CHARSET.len();
    let limit = 256 - (256 % n);
    let mut password = String::with_capacity(length);
    let mut buf = [0u8; 64];

    while password.len() < length {
        rng.fill(&mut buf)?;
        for &b in &buf {
            if usize::from(b) >= limit {
                continue;
            }
            password.push(char::from(PASSWORD_CHARSET[usize::from(b) % n]));
            if password.len() == length {
                break;
            }
        }
    }

    Ok(password)
}
