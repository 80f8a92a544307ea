//! Password hashing and verification with bcrypt.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

// bcrypt only hashes the first 72 bytes of input
const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password with a randomized salt.
///
/// Rejects empty input and input beyond bcrypt's 72-byte limit.
/// Fails otherwise only on hasher-internal error.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.trim().is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "password".to_string(),
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_BYTES,
        )));
    }

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against its stored digest.
///
/// Returns `false` on mismatch; errors only when the stored digest itself
/// is corrupt.
pub fn verify_password(password: &str, digest: &str) -> Result<bool, AppError> {
    verify(password, digest)
        .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_not_the_plaintext() {
        let digest = hash_password("Secret1!").expect("failed to hash");
        assert_ne!(digest, "Secret1!");
        assert!(digest.starts_with("$2"));
    }

    #[test]
    fn round_trip_verifies() {
        let digest = hash_password("Secret1!").expect("failed to hash");
        assert!(verify_password("Secret1!", &digest).expect("failed to verify"));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let digest = hash_password("Secret1!").expect("failed to hash");
        assert!(!verify_password("NotTheSecret", &digest).expect("failed to verify"));
    }

    #[test]
    fn same_password_hashes_differently() {
        // Randomized salt
        let a = hash_password("Secret1!").unwrap();
        let b = hash_password("Secret1!").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(hash_password("").is_err());
        assert!(hash_password("   ").is_err());
    }

    #[test]
    fn oversized_password_is_rejected() {
        assert!(hash_password(&"a".repeat(73)).is_err());
    }
}
