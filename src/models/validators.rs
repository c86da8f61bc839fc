use std::{borrow::Cow, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use validator::ValidationError;

/// Digits only. Ids are numeric-looking but never signed or fractional.
/// Examples: "12345", "007"
pub static NUMERIC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("numeric id regex is valid"));

/// Calendar date format accepted for date filters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validate that an id parameter holds digits only, ignoring surrounding
/// whitespace.
pub fn validate_numeric_id(value: &str) -> Result<(), ValidationError> {
    if NUMERIC_REGEX.is_match(value.trim()) {
        return Ok(());
    }
    let mut err = ValidationError::new("numeric_only");
    err.message = Some(Cow::Borrowed("must be numeric only"));
    Err(err)
}

/// Validate that a date parameter is a real `YYYY-MM-DD` calendar date.
///
/// `2024-13-01` and `2024-02-30` are rejected, as is the empty string.
/// Surrounding whitespace is rejected too, since dates are compared as text.
pub fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    if value.trim() == value && parse_iso_date(value).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("iso_date");
    err.message = Some(Cow::Borrowed("must be in YYYY-MM-DD format"));
    Err(err)
}

/// Parse a `YYYY-MM-DD` date. Used for both validation and report ordering.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("12345", true)]
    #[case(" 42 ", true)]
    #[case("0", true)]
    #[case("12a", false)]
    #[case("-1", false)]
    #[case("1.0", false)]
    #[case("", false)]
    fn test_validate_numeric_id(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(validate_numeric_id(value).is_ok(), valid);
    }

    #[rstest]
    #[case("2024-03-01", true)]
    #[case("2024-02-29", true)]
    #[case("2024-13-01", false)]
    #[case("2023-02-29", false)]
    #[case("03/01/2024", false)]
    #[case(" 2024-03-01", false)]
    #[case("2024-03-01 ", false)]
    #[case("", false)]
    fn test_validate_iso_date(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(validate_iso_date(value).is_ok(), valid);
    }

    #[test]
    fn test_error_carries_message() {
        let err = validate_iso_date("yesterday").unwrap_err();
        assert_eq!(err.code, "iso_date");
        assert_eq!(err.message.as_deref(), Some("must be in YYYY-MM-DD format"));
    }
}
