use chrono::{DateTime, Utc};

use crate::constants::{ERR_INVALID_EMAIL, ERR_MISSING_NAME, MIN_PASSWORD_LEN};
use crate::error::{AppError, Result};
use crate::models::User;

/// Convert Unix timestamp to RFC3339 string, defaulting to now if invalid
pub fn timestamp_to_rfc3339(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

/// Registration fields after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub name: String,
}

/// Validate registration input, returning the normalized email and name
pub fn validate_registration(email: &str, password: &str, name: &str) -> Result<Registration> {
    let email = User::normalize_email(email);
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };
    if !valid_email {
        return Err(AppError::InvalidInput(ERR_INVALID_EMAIL.to_string()));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(ERR_MISSING_NAME.to_string()));
    }

    Ok(Registration {
        email,
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_email_and_name() {
        let reg = validate_registration("  Ada@Example.COM ", "secret", " Ada ").unwrap();
        assert_eq!(reg.email, "ada@example.com");
        assert_eq!(reg.name, "Ada");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(validate_registration("no-at-sign", "secret", "Ada").is_err());
        assert!(validate_registration("@example.com", "secret", "Ada").is_err());
        assert!(validate_registration("ada@example.com", "12345", "Ada").is_err());
        assert!(validate_registration("ada@example.com", "secret", "   ").is_err());
    }

    #[test]
    fn test_timestamp_to_rfc3339() {
        assert_eq!(timestamp_to_rfc3339(0), "1970-01-01T00:00:00+00:00");
    }
}
