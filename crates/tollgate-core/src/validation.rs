//! Input validation shared by login, registration and profile updates

use crate::error::CoreError;

/// Maximum email length
const MAX_EMAIL_LENGTH: usize = 100;

/// Minimum password length for new accounts
const MIN_NEW_SECRET_LENGTH: usize = 6;

/// Maximum password length (bounds hashing cost)
const MAX_SECRET_LENGTH: usize = 256;

/// Maximum length of first and last names
const MAX_NAME_LENGTH: usize = 50;

/// Validate the rough shape of an email address
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CoreError::InvalidInput("Email is required".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(CoreError::InvalidInput(format!(
            "Email exceeds maximum length of {} characters",
            MAX_EMAIL_LENGTH
        )));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(CoreError::InvalidInput("Email is malformed".to_string()));
    };
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
    {
        return Err(CoreError::InvalidInput("Email is malformed".to_string()));
    }

    Ok(())
}

/// Validate a login secret: present and bounded
pub fn validate_login_secret(secret: &str) -> Result<(), CoreError> {
    if secret.is_empty() {
        return Err(CoreError::InvalidInput("Password is required".to_string()));
    }
    if secret.len() > MAX_SECRET_LENGTH {
        return Err(CoreError::InvalidInput(format!(
            "Password exceeds maximum length of {} characters",
            MAX_SECRET_LENGTH
        )));
    }
    Ok(())
}

/// Validate the secret for a new account
pub fn validate_new_secret(secret: &str) -> Result<(), CoreError> {
    validate_login_secret(secret)?;
    if secret.len() < MIN_NEW_SECRET_LENGTH {
        return Err(CoreError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_NEW_SECRET_LENGTH
        )));
    }
    Ok(())
}

/// Validate a first or last name
pub fn validate_name(field: &str, value: &str) -> Result<(), CoreError> {
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::InvalidInput(format!(
            "{} exceeds maximum length of {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Validate that a required text field is present
pub fn require_field(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("u@x.com").is_ok());
        assert!(validate_email("  u@x.com ").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("u@").is_err());
        assert!(validate_email("u@x@y.com").is_err());
        assert!(validate_email("u v@x.com").is_err());
        assert!(validate_email(&format!("{}@x.com", "a".repeat(100))).is_err());
    }

    #[test]
    fn test_secret_bounds() {
        assert!(validate_login_secret("x").is_ok());
        assert!(validate_login_secret("").is_err());
        assert!(validate_login_secret(&"x".repeat(257)).is_err());

        assert!(validate_new_secret("secret").is_ok());
        assert!(validate_new_secret("short").is_err());
        assert!(validate_new_secret(&"x".repeat(256)).is_ok());
    }

    #[test]
    fn test_name_and_required_fields() {
        assert!(validate_name("First name", "Ada").is_ok());
        assert!(validate_name("First name", &"a".repeat(51)).is_err());

        let err = require_field("City", "   ").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: City is required");
    }
}
