//! Input validators for registration and profile updates.
//!
//! Every validator trims its input and returns the normalized value that
//! should be persisted: usernames and emails are additionally lowercased so
//! uniqueness checks are case-insensitive by construction.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 30;
const MAX_FULLNAME_LENGTH: usize = 128;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // Lowercase handle: letters, digits, dot, underscore, hyphen
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-z0-9._-]+$").unwrap();
}

/// Validates and normalizes an email address (trimmed, lowercased).
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }
    if trimmed.matches('@').count() != 1 || trimmed.contains('\0') {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

/// Validates and normalizes a username (trimmed, lowercased).
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let normalized = username.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }
    if normalized.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort(
            "username".to_string(),
            MIN_USERNAME_LENGTH,
        ));
    }
    if normalized.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_USERNAME_LENGTH,
        ));
    }
    if !USERNAME_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(normalized)
}

/// Validates a display name (trimmed, original casing kept).
pub fn is_valid_fullname(fullname: &str) -> Result<String, ValidationError> {
    let trimmed = fullname.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("fullname".to_string()));
    }
    if trimmed.len() > MAX_FULLNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "fullname".to_string(),
            MAX_FULLNAME_LENGTH,
        ));
    }
    if trimmed.contains('\0') || trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat("fullname".to_string()));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails_are_normalized() {
        assert_eq!(
            is_valid_email("  Jane@Example.COM ").unwrap(),
            "jane@example.com"
        );
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn invalid_email_formats_are_rejected() {
        assert!(is_valid_email("notanemail").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
        assert!(is_valid_email("").is_err());
    }

    #[test]
    fn email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());
        assert!(is_valid_email("a@b").is_err());
    }

    #[test]
    fn usernames_are_lowercased() {
        assert_eq!(is_valid_username(" JaneD ").unwrap(), "janed");
        assert!(is_valid_username("jane.doe_01").is_ok());
    }

    #[test]
    fn invalid_usernames_are_rejected() {
        assert!(is_valid_username("").is_err());
        assert!(is_valid_username("ab").is_err());
        assert!(is_valid_username("has space").is_err());
        assert!(is_valid_username(&"a".repeat(31)).is_err());
        assert!(is_valid_username("semi;colon").is_err());
    }

    #[test]
    fn fullnames_keep_casing() {
        assert_eq!(is_valid_fullname(" Jane Doe ").unwrap(), "Jane Doe");
        assert!(is_valid_fullname("Jean-Pierre O'Brien").is_ok());
    }

    #[test]
    fn invalid_fullnames_are_rejected() {
        assert!(is_valid_fullname("   ").is_err());
        assert!(is_valid_fullname("Name\0null").is_err());
        assert!(is_valid_fullname(&"a".repeat(129)).is_err());
    }
}
