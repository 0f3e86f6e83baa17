#![warn(missing_docs)]
//! # cipherframe-validate
//!
//! ## Purpose
//! Classifies single wizard inputs as valid or invalid and explains why.
//!
//! ## Responsibilities
//! - Validate required/optional path fields through an injected [`PathProbe`].
//! - Enforce the encryption password policy and report every unmet rule.
//! - Apply the weaker decryption password rule (non-empty only).
//!
//! ## Data flow
//! Wizard field value -> [`validate_path`] / [`validate_paths`] /
//! [`validate_password_field`] -> [`FieldVerdict`] written back into field state.
//!
//! ## Ownership and lifetimes
//! Validators borrow their inputs and return owned verdicts. They hold no state
//! and may run concurrently for different fields.
//!
//! ## Error model
//! Validation outcomes are values, not errors: an invalid input is a normal
//! [`FieldVerdict`] with `valid == false` and a display message.
//!
//! ## Security and privacy notes
//! Password verdicts never echo the password back; messages only name the
//! missing character classes.
//!
//! ## Example
//! ```rust
//! use cipherframe_validate::{PasswordRequirement, validate_password};
//!
//! let verdict = validate_password("abcDEFG1");
//! assert_eq!(verdict.missing, vec![PasswordRequirement::SpecialCharacter]);
//! assert!(validate_password("abcDEFG1!").valid);
//! ```

use async_trait::async_trait;
use cipherframe_core::JobKind;
use futures_util::future::join_all;

/// Message shown for a required field left empty.
pub const MSG_REQUIRED: &str = "required";
/// Message shown for a path that does not exist.
pub const MSG_INVALID_PATH: &str = "invalid path";
/// Minimum password length for encryption.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Capability answering whether a path exists.
///
/// Injected so validation runs without a real filesystem in tests.
#[async_trait]
pub trait PathProbe: Send + Sync {
    /// Returns `true` when `path` exists.
    async fn exists(&self, path: &str) -> bool;
}

/// Result of validating one field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldVerdict {
    /// Whether the value is acceptable.
    pub valid: bool,
    /// Reason shown inline; empty when valid.
    pub message: String,
}

impl FieldVerdict {
    /// Valid verdict with empty message.
    pub fn valid() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    /// Invalid verdict with a display message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Validates one path field.
///
/// Semantics:
/// - empty + required => invalid, `"required"`
/// - empty + optional => valid
/// - non-empty => valid iff the probe reports the path exists, else `"invalid path"`
///
/// Whitespace-only input counts as empty.
pub async fn validate_path(path: &str, is_required: bool, probe: &dyn PathProbe) -> FieldVerdict {
    let path = path.trim();
    if path.is_empty() {
        return if is_required {
            FieldVerdict::invalid(MSG_REQUIRED)
        } else {
            FieldVerdict::valid()
        };
    }

    if probe.exists(path).await {
        FieldVerdict::valid()
    } else {
        FieldVerdict::invalid(MSG_INVALID_PATH)
    }
}

/// Validates a multi-path field holding one path per line.
///
/// Blank lines are ignored. Every listed path is probed concurrently; the field
/// is invalid when any of them is missing.
pub async fn validate_paths(value: &str, is_required: bool, probe: &dyn PathProbe) -> FieldVerdict {
    let paths = split_paths(value);
    if paths.is_empty() {
        return validate_path("", is_required, probe).await;
    }

    let checks = join_all(paths.iter().map(|path| probe.exists(path))).await;
    if checks.into_iter().all(|exists| exists) {
        FieldVerdict::valid()
    } else {
        FieldVerdict::invalid(MSG_INVALID_PATH)
    }
}

/// Splits a multi-path field value into trimmed, non-empty paths.
pub fn split_paths(value: &str) -> Vec<&str> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// One rule of the encryption password policy, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PasswordRequirement {
    /// At least [`MIN_PASSWORD_LEN`] characters.
    Length,
    /// At least one uppercase letter.
    Uppercase,
    /// At least one lowercase letter.
    Lowercase,
    /// At least one digit.
    Digit,
    /// At least one non-whitespace character outside ASCII letters and digits.
    SpecialCharacter,
    /// No whitespace anywhere.
    NoSpaces,
}

impl PasswordRequirement {
    /// Short phrase used when composing the policy message.
    pub fn describe(&self) -> &'static str {
        match self {
            PasswordRequirement::Length => "at least 8 characters",
            PasswordRequirement::Uppercase => "an uppercase letter",
            PasswordRequirement::Lowercase => "a lowercase letter",
            PasswordRequirement::Digit => "a number",
            PasswordRequirement::SpecialCharacter => "a special character",
            PasswordRequirement::NoSpaces => "no spaces",
        }
    }
}

/// Outcome of the password policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordVerdict {
    /// `true` when every requirement is met.
    pub valid: bool,
    /// Unmet requirements in policy order.
    pub missing: Vec<PasswordRequirement>,
}

impl PasswordVerdict {
    /// Composes a single display message from the unmet requirements.
    ///
    /// Returns an empty string for a valid password.
    pub fn message(&self) -> String {
        let positives: Vec<&str> = self
            .missing
            .iter()
            .filter(|requirement| **requirement != PasswordRequirement::NoSpaces)
            .map(PasswordRequirement::describe)
            .collect();
        let forbids_spaces = self.missing.contains(&PasswordRequirement::NoSpaces);

        match (positives.is_empty(), forbids_spaces) {
            (true, false) => String::new(),
            (true, true) => "Password must not contain spaces".to_string(),
            (false, false) => format!("Password must contain {}", join_phrases(&positives)),
            (false, true) => format!(
                "Password must contain {} and must not contain spaces",
                join_phrases(&positives)
            ),
        }
    }
}

/// Checks a password against the full encryption policy.
///
/// Letters and digits are ASCII classes; every other non-whitespace
/// character, including non-ASCII letters and digits, counts as special.
/// Every requirement is checked independently, so several may be reported at
/// once.
pub fn validate_password(password: &str) -> PasswordVerdict {
    let mut missing = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        missing.push(PasswordRequirement::Length);
    }
    if !password.chars().any(|ch| ch.is_ascii_uppercase()) {
        missing.push(PasswordRequirement::Uppercase);
    }
    if !password.chars().any(|ch| ch.is_ascii_lowercase()) {
        missing.push(PasswordRequirement::Lowercase);
    }
    if !password.chars().any(|ch| ch.is_ascii_digit()) {
        missing.push(PasswordRequirement::Digit);
    }
    if !password
        .chars()
        .any(|ch| !ch.is_ascii_alphanumeric() && !ch.is_whitespace())
    {
        missing.push(PasswordRequirement::SpecialCharacter);
    }
    if password.chars().any(char::is_whitespace) {
        missing.push(PasswordRequirement::NoSpaces);
    }

    PasswordVerdict {
        valid: missing.is_empty(),
        missing,
    }
}

/// Validates the password field for the given job direction.
///
/// Encryption enforces [`validate_password`]. Decryption accepts any non-empty
/// value because only the engine can check it against the stored key.
pub fn validate_password_field(kind: JobKind, password: &str) -> FieldVerdict {
    if password.is_empty() {
        return FieldVerdict::invalid(MSG_REQUIRED);
    }

    match kind {
        JobKind::Decrypt => FieldVerdict::valid(),
        JobKind::Encrypt => {
            let verdict = validate_password(password);
            if verdict.valid {
                FieldVerdict::valid()
            } else {
                FieldVerdict::invalid(verdict.message())
            }
        }
    }
}

fn join_phrases(phrases: &[&str]) -> String {
    match phrases {
        [] => String::new(),
        [only] => (*only).to_string(),
        [head @ .., last] => format!("{} and {last}", head.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for password policy composition.

    use super::*;

    #[test]
    fn reports_all_missing_requirements_in_order() {
        let verdict = validate_password("ab c");
        assert_eq!(
            verdict.missing,
            vec![
                PasswordRequirement::Length,
                PasswordRequirement::Uppercase,
                PasswordRequirement::Digit,
                PasswordRequirement::SpecialCharacter,
                PasswordRequirement::NoSpaces,
            ]
        );
        assert_eq!(
            verdict.message(),
            "Password must contain at least 8 characters, an uppercase letter, a number and a special character and must not contain spaces"
        );
    }

    #[test]
    fn whitespace_does_not_count_as_special_character() {
        let verdict = validate_password("abcDEFG1 ");
        assert_eq!(
            verdict.missing,
            vec![
                PasswordRequirement::SpecialCharacter,
                PasswordRequirement::NoSpaces
            ]
        );
    }

    #[test]
    fn single_requirement_message_has_no_separator() {
        let verdict = validate_password("abcDEFG1");
        assert_eq!(verdict.message(), "Password must contain a special character");
    }
}
