//! Registration input checks.
//!
//! Separators (spaces, dashes, dots, parentheses) are stripped before the
//! digit count is checked; the stored value is the bare digit string.

use crate::VerificationError;

pub const NATIONAL_ID_DIGITS: usize = 12;
pub const PHONE_DIGITS: usize = 10;

fn strip_separators(raw: &str) -> Option<String> {
    let mut digits = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }
    Some(digits)
}

/// Validate a 12-digit national id and return it without separators.
pub fn validate_national_id(raw: &str) -> Result<String, VerificationError> {
    strip_separators(raw)
        .filter(|d| d.len() == NATIONAL_ID_DIGITS)
        .ok_or(VerificationError::InvalidNationalId)
}

/// Validate a 10-digit phone number and return it without separators.
pub fn validate_phone_number(raw: &str) -> Result<String, VerificationError> {
    strip_separators(raw)
        .filter(|d| d.len() == PHONE_DIGITS)
        .ok_or(VerificationError::InvalidPhoneNumber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_id() {
        assert_eq!(validate_national_id("1234 5678 9012").unwrap(), "123456789012");
        assert!(validate_national_id("12345678901").is_err());
        assert!(validate_national_id("1234567890123").is_err());
        assert!(validate_national_id("12345678901a").is_err());
        assert!(validate_national_id("").is_err());
    }

    #[test]
    fn phone_number() {
        assert_eq!(validate_phone_number("98765-43210").unwrap(), "9876543210");
        assert_eq!(validate_phone_number("(987) 654 3210").unwrap(), "9876543210");
        assert!(validate_phone_number("+919876543210").is_err());
        assert!(validate_phone_number("987654321").is_err());
    }
}
