use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Email,
    Mobile,
}

/// A login identifier in canonical form: lower-cased email or bare 10 digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub kind: IdentifierKind,
    pub value: String,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .expect("email regex is valid")
    })
}

pub fn is_email(input: &str) -> bool {
    email_regex().is_match(input.trim())
}

/// Leading digit of synthesized mobiles on federated accounts. No real number carries it.
pub const RESERVED_MOBILE_PREFIX: char = '0';

/// Strips formatting and returns the number only if exactly 10 digits remain
/// and it does not fall in the reserved range.
pub fn normalize_mobile(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == 10 && !digits.starts_with(RESERVED_MOBILE_PREFIX)).then_some(digits)
}

pub fn normalize_email(input: &str) -> String {
    input.trim().to_lowercase()
}

pub fn resolve(input: &str) -> Result<Identifier> {
    let trimmed = input.trim();

    if is_email(trimmed) {
        return Ok(Identifier {
            kind: IdentifierKind::Email,
            value: normalize_email(trimmed),
        });
    }

    normalize_mobile(trimmed)
        .map(|value| Identifier {
            kind: IdentifierKind::Mobile,
            value,
        })
        .ok_or(AppError::InvalidIdentifier)
}

/// Validates a mobile field on a request and returns its canonical form.
pub fn require_mobile(input: &str) -> Result<String> {
    normalize_mobile(input)
        .ok_or_else(|| {
            AppError::invalid_data("Mobile number must have exactly 10 digits and not start with 0")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_email() {
        let id = resolve("user@example.com").unwrap();
        assert_eq!(id.kind, IdentifierKind::Email);
        assert_eq!(id.value, "user@example.com");

        let id = resolve("  User.Name@Example.COM ").unwrap();
        assert_eq!(id.value, "user.name@example.com");
    }

    #[test]
    fn test_resolve_mobile() {
        let id = resolve("9876543210").unwrap();
        assert_eq!(id.kind, IdentifierKind::Mobile);
        assert_eq!(id.value, "9876543210");

        assert_eq!(resolve("(987) 654-3210").unwrap().value, "9876543210");
    }

    #[test]
    fn test_resolve_invalid() {
        assert!(matches!(resolve("12345"), Err(AppError::InvalidIdentifier)));
        assert!(matches!(resolve("98765432101"), Err(AppError::InvalidIdentifier)));
        assert!(matches!(resolve("not-an-email@"), Err(AppError::InvalidIdentifier)));
        assert!(matches!(resolve(""), Err(AppError::InvalidIdentifier)));
    }

    #[test]
    fn test_reserved_range_is_never_a_mobile() {
        assert_eq!(normalize_mobile("0642086420"), None);
        assert!(matches!(resolve("0642086420"), Err(AppError::InvalidIdentifier)));
        assert!(require_mobile("064 208 6420").is_err());
        assert_eq!(require_mobile("7642086420").unwrap(), "7642086420");
    }
}
