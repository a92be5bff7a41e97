//! Password hashing, verification and complexity rules
//!
//! Hashing uses the argon2id variant with default parameters; the stored form
//! is a PHC string carrying salt and parameters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::GatewayError;

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Symbols of which a password must contain at least one
pub const PASSWORD_SYMBOLS: &[char] = &['!', '%', '*', '#', '?', '&'];

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, GatewayError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GatewayError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
///
/// Returns true if the password matches the hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, GatewayError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| GatewayError::Internal(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Check length and character-class requirements
pub fn validate_password_complexity(password: &str) -> Result<(), GatewayError> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(&c));

    if long_enough && has_letter && has_digit && has_symbol {
        Ok(())
    } else {
        Err(GatewayError::InvalidPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).unwrap();

        // Hash should be in PHC format
        assert!(hash.starts_with("$argon2"));

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_different_salts() {
        let password = "same-password";
        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "not-a-valid-hash");
        assert!(result.is_err());
    }

    #[test]
    fn test_complexity_accepts() {
        for ok in ["abc123!@", "Passw0rd#", "a1&aaaaa", "zzzz9999?"] {
            assert!(validate_password_complexity(ok).is_ok(), "{ok} should pass");
        }
    }

    #[test]
    fn test_complexity_rejects() {
        for bad in [
            "abc12345",  // no symbol
            "abcdefg!",  // no digit
            "1234567!",  // no letter
            "ab1!",      // too short
            "abc123@@",  // symbol outside the set
            "",
        ] {
            assert!(
                matches!(
                    validate_password_complexity(bad),
                    Err(GatewayError::InvalidPassword)
                ),
                "{bad} should fail"
            );
        }
    }
}
