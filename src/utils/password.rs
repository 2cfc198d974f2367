use bcrypt::{hash, verify, DEFAULT_COST};

use crate::errors::{AppError, Result};

/// bcrypt ignores everything past this many bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Minimum password strength for accounts that log in with a password.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < 8 {
        return Err(AppError::invalid_data("Password must be at least 8 characters"));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::invalid_data(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter || !has_digit {
        return Err(AppError::invalid_data(
            "Password must contain letters and digits",
        ));
    }

    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    Ok(hash(password, DEFAULT_COST)?)
}

/// The only credential check in the system: submitted secret against a stored bcrypt hash.
/// A stored value that is not a bcrypt hash never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match verify(password, stored_hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!("Stored credential is not a valid bcrypt hash: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("password").is_err()); // no digit
        assert!(validate_password("12345678").is_err()); // no letter
        assert!(validate_password("pass1").is_err()); // too short
    }

    #[test]
    fn test_password_capped_at_bcrypt_input() {
        let at_cap = format!("a1{}", "x".repeat(MAX_PASSWORD_BYTES - 2));
        assert!(validate_password(&at_cap).is_ok());

        let over = format!("{}y", at_cap);
        assert!(validate_password(&over).is_err());

        // 36 two-byte letters plus a digit: 37 characters, 73 bytes.
        let multibyte = format!("{}1", "é".repeat(36));
        assert!(validate_password(&multibyte).is_err());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hashed = hash_password("password123").unwrap();

        assert!(verify_password("password123", &hashed));
        assert!(!verify_password("password124", &hashed));
    }

    #[test]
    fn test_plaintext_store_never_matches() {
        assert!(!verify_password("password123", "password123"));
    }
}
