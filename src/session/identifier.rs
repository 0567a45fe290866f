//! Connection identifier extraction
//!
//! The hosting page embeds the connection identifier as a base64 string
//! whose decoded form begins with a decimal numeric run followed by an
//! arbitrary suffix (e.g. `"12345-abc"`). Only the leading digits name the
//! connection.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::session::error::SessionError;

/// Extract the numeric connection identifier from an encoded string.
///
/// Decodes `encoded` as standard base64 and returns the leading decimal
/// digit run of the decoded text. Fails with
/// [`SessionError::InvalidIdentifier`] when decoding fails, the decoded
/// bytes are not UTF-8, or no leading digits are present.
pub fn extract_id(encoded: &str) -> Result<String, SessionError> {
    let decoded = STANDARD
        .decode(encoded)
        .map_err(|e| SessionError::InvalidIdentifier(format!("base64 decode failed: {e}")))?;

    let decoded = String::from_utf8(decoded)
        .map_err(|_| SessionError::InvalidIdentifier("decoded bytes are not UTF-8".into()))?;

    let digits: String = decoded.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(SessionError::InvalidIdentifier(
            "no leading digits in decoded identifier".into(),
        ));
    }

    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_id_with_suffix() {
        // "MTIzNDUtYWJj" decodes to "12345-abc"
        assert_eq!(extract_id("MTIzNDUtYWJj").unwrap(), "12345");
    }

    #[test]
    fn test_extract_id_digits_only() {
        let encoded = STANDARD.encode("98765");
        assert_eq!(extract_id(&encoded).unwrap(), "98765");
    }

    #[test]
    fn test_malformed_base64_rejected() {
        let err = extract_id("!!not-base64!!").unwrap_err();
        assert!(matches!(err, SessionError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_no_leading_digits_rejected() {
        let encoded = STANDARD.encode("abc-123");
        let err = extract_id(&encoded).unwrap_err();
        assert!(matches!(err, SessionError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(extract_id("").is_err());
    }

    #[test]
    fn test_non_utf8_rejected() {
        let encoded = STANDARD.encode([0x31, 0x32, 0xFF, 0xFE]);
        assert!(extract_id(&encoded).is_err());
    }

    proptest! {
        // Any digit run followed by an arbitrary non-digit-leading suffix
        // round-trips to exactly that digit run.
        #[test]
        fn prop_leading_digits_extracted(
            digits in "[0-9]{1,12}",
            suffix in "[a-z-][a-z0-9-]{0,16}",
        ) {
            let encoded = STANDARD.encode(format!("{digits}{suffix}"));
            prop_assert_eq!(extract_id(&encoded).unwrap(), digits);
        }

        #[test]
        fn prop_no_digits_always_fails(suffix in "[a-z-]{1,16}") {
            let encoded = STANDARD.encode(&suffix);
            prop_assert!(extract_id(&encoded).is_err());
        }
    }
}
