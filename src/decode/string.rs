use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::Reject;
use crate::ir::{JsonKind, StrFormat};

// scheme ":" then at least one non-space character
static URI_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$").expect("static regex")
});

pub(super) fn decode_string(
    enum_: &[String],
    pattern: Option<&Regex>,
    format: Option<StrFormat>,
    value: &Value,
) -> Result<Value, Reject> {
    let Value::String(s) = value else {
        return Err(Reject::mismatch("string", JsonKind::of(value)));
    };
    if !enum_.is_empty() && !enum_.iter().any(|lit| lit == s) {
        return Err(Reject::custom(format!("{s:?} is not one of [{}]", enum_.join(", "))));
    }
    if let Some(rx) = pattern {
        if !rx.is_match(s) {
            return Err(Reject::custom(format!("{s:?} does not match pattern {}", rx.as_str())));
        }
    }
    if let Some(format) = format {
        if !matches_format(format, s) {
            return Err(Reject::custom(format!("{s:?} is not a valid {}", format.as_str())));
        }
    }
    Ok(value.clone())
}

pub fn matches_format(format: StrFormat, s: &str) -> bool {
    match format {
        StrFormat::Uri => URI_RX.is_match(s),
        StrFormat::DateTime => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        StrFormat::Date => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_strings_pass_and_others_mismatch() {
        assert_eq!(decode_string(&[], None, None, &json!("garric")), Ok(json!("garric")));
        assert_eq!(
            decode_string(&[], None, None, &json!(33)),
            Err(Reject::mismatch("string", JsonKind::Integer))
        );
    }

    #[test]
    fn enum_membership() {
        let lits = vec!["hardware".to_string(), "store".to_string()];
        assert!(decode_string(&lits, None, None, &json!("store")).is_ok());
        assert_eq!(
            decode_string(&lits, None, None, &json!("outlet")),
            Err(Reject::custom("\"outlet\" is not one of [hardware, store]"))
        );
    }

    #[test]
    fn pattern_is_checked() {
        let rx = Regex::new(r"^0ahUKEa\dZQ$").unwrap();
        assert!(decode_string(&[], Some(&rx), None, &json!("0ahUKEa1ZQ")).is_ok());
        assert!(matches!(
            decode_string(&[], Some(&rx), None, &json!("nope")),
            Err(Reject::Custom { .. })
        ));
    }

    #[test]
    fn formats() {
        assert!(matches_format(StrFormat::Uri, "https://example.com/a"));
        assert!(matches_format(StrFormat::Uri, "mailto:someone@example.com"));
        assert!(!matches_format(StrFormat::Uri, "example dot com"));
        assert!(matches_format(StrFormat::DateTime, "2024-05-01T12:30:00Z"));
        assert!(!matches_format(StrFormat::DateTime, "2024-05-01"));
        assert!(matches_format(StrFormat::Date, "2024-05-01"));
        assert!(!matches_format(StrFormat::Date, "2024-13-01"));
    }
}
