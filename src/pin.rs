//! Confirmation PIN hashing and verification.
//!
//! PINs are exactly 4 numeric digits, stored only as bcrypt hashes.

use crate::error::AppError;

const PIN_LENGTH: usize = 4;

/// Shape check: exactly 4 ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Hash a PIN for storage. Fails on malformed input so a bad PIN can never
/// be persisted.
pub fn hash_pin(pin: &str) -> Result<String, AppError> {
    if !is_valid_pin(pin) {
        return Err(AppError::bad_request("PIN must be exactly 4 numeric digits"));
    }

    bcrypt::hash(pin, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("hash PIN: {e}")))
}

/// Verify a presented PIN against the stored hash.
pub fn verify_pin(pin_hash: &str, pin: &str) -> Result<(), AppError> {
    if pin_hash.is_empty() {
        return Err(AppError::bad_request("PIN not set"));
    }

    if !is_valid_pin(pin) {
        return Err(AppError::bad_request("PIN must be exactly 4 numeric digits"));
    }

    let matches = bcrypt::verify(pin, pin_hash)
        .map_err(|e| AppError::internal(format!("verify PIN: {e}")))?;

    if !matches {
        return Err(AppError::bad_request("invalid PIN"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_shape() {
        assert!(is_valid_pin("1234"));
        assert!(is_valid_pin("0000"));
        assert!(!is_valid_pin("123"));
        assert!(!is_valid_pin("12345"));
        assert!(!is_valid_pin("12a4"));
        assert!(!is_valid_pin(""));
        assert!(!is_valid_pin("١٢٣٤")); // non-ASCII digits rejected
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_pin("1234").unwrap();
        assert!(verify_pin(&hash, "1234").is_ok());

        let err = verify_pin(&hash, "9999").unwrap_err();
        assert_eq!(err.category(), "bad_request");
        assert_eq!(err.to_string(), "invalid PIN");
    }

    #[test]
    fn unset_hash_is_rejected() {
        let err = verify_pin("", "1234").unwrap_err();
        assert_eq!(err.category(), "bad_request");
    }

    #[test]
    fn malformed_pin_is_rejected_before_bcrypt() {
        let hash = hash_pin("1234").unwrap();
        assert!(verify_pin(&hash, "12").is_err());
        assert!(hash_pin("abcd").is_err());
    }
}
