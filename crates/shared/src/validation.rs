//! Common validation utilities.
//!
//! Every validator returns a [`ValidationError`] carrying a stable code and the
//! Bengali message shown next to the offending field. Lengths are counted in
//! characters after trimming, never in bytes.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Minimum title length in characters after trimming.
pub const TITLE_MIN_CHARS: usize = 10;

/// Minimum description length in characters after trimming.
pub const DESCRIPTION_MIN_CHARS: usize = 30;

lazy_static! {
    // ASCII digits only; `\d` would also accept Bengali numerals.
    static ref BD_MOBILE: Regex = Regex::new(r"^01[3-9][0-9]{8}$").unwrap();
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Number of characters in `value` once surrounding whitespace is removed.
pub fn trimmed_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// Strips spaces and hyphens from a phone number as typed by the user.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Rejects values that are empty after trimming.
pub fn validate_required(
    value: &str,
    code: &'static str,
    message: &'static str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error(code, message))
    } else {
        Ok(())
    }
}

/// Rejects values shorter than `min` characters after trimming.
pub fn validate_min_trimmed(
    value: &str,
    min: usize,
    code: &'static str,
    message: &'static str,
) -> Result<(), ValidationError> {
    if trimmed_len(value) < min {
        Err(error(code, message))
    } else {
        Ok(())
    }
}

/// Validates a problem title: required, at least 10 characters.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    validate_required(title, "title_required", "শিরোনাম লিখুন")?;
    validate_min_trimmed(
        title,
        TITLE_MIN_CHARS,
        "title_too_short",
        "শিরোনাম কমপক্ষে ১০ অক্ষর হতে হবে",
    )
}

/// Validates a problem description: required, at least 30 characters.
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    validate_required(description, "description_required", "বিস্তারিত বর্ণনা লিখুন")?;
    validate_min_trimmed(
        description,
        DESCRIPTION_MIN_CHARS,
        "description_too_short",
        "বিস্তারিত কমপক্ষে ৩০ অক্ষর হতে হবে",
    )
}

/// Validates the submitter's display name.
pub fn validate_submitter_name(name: &str) -> Result<(), ValidationError> {
    validate_required(name, "submitter_name_required", "আপনার নাম লিখুন")
}

/// Validates a Bangladeshi mobile number in local 11-digit form (`01[3-9]XXXXXXXX`).
///
/// Spaces and hyphens are ignored. Country-code prefixes are not accepted.
pub fn validate_bd_mobile(phone: &str) -> Result<(), ValidationError> {
    validate_required(phone, "phone_required", "মোবাইল নম্বর লিখুন")?;
    if BD_MOBILE.is_match(&normalize_phone(phone)) {
        Ok(())
    } else {
        Err(error(
            "phone_invalid",
            "সঠিক মোবাইল নম্বর লিখুন (01XXXXXXXXX)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(result: Result<(), ValidationError>) -> String {
        result.unwrap_err().code.to_string()
    }

    #[test]
    fn test_trimmed_len_counts_characters() {
        assert_eq!(trimmed_len("  abc  "), 3);
        assert_eq!(trimmed_len("রাস্তা"), "রাস্তা".chars().count());
        assert_eq!(trimmed_len("   "), 0);
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("017 1234-5678"), "01712345678");
        assert_eq!(normalize_phone("01712345678"), "01712345678");
        assert_eq!(normalize_phone(" 0171-234-5678 "), "01712345678");
    }

    #[test]
    fn test_validate_title_boundary() {
        assert_eq!(code(validate_title("")), "title_required");
        assert_eq!(code(validate_title("    ")), "title_required");
        assert_eq!(code(validate_title("123456789")), "title_too_short");
        assert_eq!(code(validate_title("   123456789   ")), "title_too_short");
        assert!(validate_title("1234567890").is_ok());
        assert!(validate_title("  1234567890  ").is_ok());
    }

    #[test]
    fn test_validate_title_bengali_boundary() {
        let nine: String = "ক".repeat(9);
        let ten: String = "ক".repeat(10);
        assert_eq!(code(validate_title(&nine)), "title_too_short");
        assert!(validate_title(&ten).is_ok());
    }

    #[test]
    fn test_validate_title_error_message() {
        let err = validate_title("short").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "শিরোনাম কমপক্ষে ১০ অক্ষর হতে হবে"
        );
    }

    #[test]
    fn test_validate_description_boundary() {
        assert_eq!(code(validate_description("")), "description_required");
        assert_eq!(
            code(validate_description(&"a".repeat(29))),
            "description_too_short"
        );
        assert!(validate_description(&"a".repeat(30)).is_ok());
        assert_eq!(
            code(validate_description(&format!("  {}  ", "a".repeat(29)))),
            "description_too_short"
        );
    }

    #[test]
    fn test_validate_submitter_name() {
        assert!(validate_submitter_name("রহিম উদ্দিন").is_ok());
        assert_eq!(code(validate_submitter_name(" ")), "submitter_name_required");
    }

    #[test]
    fn test_validate_bd_mobile_valid_prefixes() {
        for operator in 3..=9 {
            let phone = format!("01{}12345678", operator);
            assert!(validate_bd_mobile(&phone).is_ok(), "{} should pass", phone);
        }
    }

    #[test]
    fn test_validate_bd_mobile_with_separators() {
        assert!(validate_bd_mobile("017 1234 5678").is_ok());
        assert!(validate_bd_mobile("017-1234-5678").is_ok());
    }

    #[test]
    fn test_validate_bd_mobile_invalid() {
        let invalid = [
            "01212345678",   // operator digit 2
            "01112345678",   // operator digit 1
            "0171234567",    // 10 digits
            "017123456789",  // 12 digits
            "+8801712345678",
            "8801712345678",
            "1712345678",
            "0171234567a",
            "০১৭১২৩৪৫৬৭৮", // Bengali numerals
        ];
        for phone in invalid {
            assert_eq!(code(validate_bd_mobile(phone)), "phone_invalid", "{}", phone);
        }
    }

    #[test]
    fn test_validate_bd_mobile_required() {
        assert_eq!(code(validate_bd_mobile("")), "phone_required");
        assert_eq!(code(validate_bd_mobile("   ")), "phone_required");
    }
}
