//! Type mapping from source column categories to target column types.
//!
//! Each target has its own [`TypeMapper`](crate::core::TypeMapper). The
//! default-value policy is shared and lives here.

mod json;
mod mysql;
mod sqlite;

pub use json::JsonTypeMapper;
pub use mysql::MysqlTypeMapper;
pub use sqlite::SqliteTypeMapper;

use chrono::{NaiveDate, NaiveDateTime};

use crate::core::{Column, DefaultValue, DATETIME_FORMAT};

/// Timestamp default used when the source has none.
pub const EPOCH_ZERO: &str = "0000-00-00 00:00:00";

/// Decimal places applied to floating values when the column declares none.
pub const DEFAULT_FLOAT_PRECISION: u32 = 2;

/// Remove one pair of surrounding double quotes.
pub fn strip_quotes(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Whether a raw default asks for the current time (`Now()`, `=Now()`).
pub fn is_now_expression(raw: &str) -> bool {
    raw.trim()
        .trim_start_matches('=')
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("now")
}

/// Map a raw Yes/No style default to `1` or `0`.
pub fn boolean_default(raw: Option<&str>) -> &'static str {
    match raw.map(|r| strip_quotes(r).to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "yes" | "true" | "on" | "-1" | "1") => "1",
        _ => "0",
    }
}

/// Decimal places for value-time rounding of a floating column.
pub fn float_precision(col: &Column) -> u32 {
    if col.precision == 0 {
        DEFAULT_FLOAT_PRECISION
    } else {
        u32::from(col.precision)
    }
}

/// Default for numeric columns: the raw default when it is a finite number,
/// else `0`.
///
/// Returns the default and a warning when the raw expression was dropped.
pub fn numeric_default(raw: Option<&str>) -> (DefaultValue, Option<String>) {
    match raw.map(strip_quotes) {
        Some(v) if v.parse::<f64>().is_ok_and(f64::is_finite) => {
            (DefaultValue::Literal(v.to_string()), None)
        }
        Some(v) if !v.is_empty() => (
            DefaultValue::Literal("0".to_string()),
            Some(format!("numeric default expression '{}' replaced with 0", v)),
        ),
        _ => (DefaultValue::Literal("0".to_string()), None),
    }
}

/// Default for timestamp columns.
///
/// `Now()` maps to `CURRENT_TIMESTAMP`, a parseable date is kept as a
/// literal, anything else falls back to [`EPOCH_ZERO`].
pub fn timestamp_default(raw: Option<&str>) -> (DefaultValue, Option<String>) {
    let Some(raw) = raw else {
        return (DefaultValue::Literal(EPOCH_ZERO.to_string()), None);
    };

    if is_now_expression(raw) {
        return (DefaultValue::Keyword("CURRENT_TIMESTAMP"), None);
    }

    match parse_date_literal(raw) {
        Some(dt) => (
            DefaultValue::Literal(dt.format(DATETIME_FORMAT).to_string()),
            None,
        ),
        None => (
            DefaultValue::Literal(EPOCH_ZERO.to_string()),
            Some(format!(
                "timestamp default expression '{}' replaced with {}",
                raw, EPOCH_ZERO
            )),
        ),
    }
}

/// Default for text columns: the raw default without quotes, else empty.
pub fn text_default(raw: Option<&str>) -> DefaultValue {
    DefaultValue::Literal(raw.map(strip_quotes).unwrap_or_default().to_string())
}

/// Parse `#2020-01-31#`, `"1/31/2020"`, `2020-01-31 10:00:00` style literals.
fn parse_date_literal(raw: &str) -> Option<NaiveDateTime> {
    let v = strip_quotes(raw).trim_matches('#').trim();

    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(v, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(v, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("abc"), "abc");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("\"\""), "");
    }

    #[test]
    fn test_now_expression() {
        assert!(is_now_expression("Now()"));
        assert!(is_now_expression("=Now()"));
        assert!(is_now_expression("now"));
        assert!(!is_now_expression("Date()"));
        assert!(!is_now_expression("#1/1/2000#"));
    }

    #[test]
    fn test_boolean_default() {
        assert_eq!(boolean_default(Some("Yes")), "1");
        assert_eq!(boolean_default(Some("No")), "0");
        assert_eq!(boolean_default(Some("True")), "1");
        assert_eq!(boolean_default(Some("-1")), "1");
        assert_eq!(boolean_default(Some("False")), "0");
        assert_eq!(boolean_default(None), "0");
    }

    #[test]
    fn test_numeric_default() {
        assert_eq!(
            numeric_default(Some("42")).0,
            DefaultValue::Literal("42".into())
        );
        assert_eq!(
            numeric_default(Some("1.5")).0,
            DefaultValue::Literal("1.5".into())
        );
        assert_eq!(numeric_default(None).0, DefaultValue::Literal("0".into()));

        let (value, warning) = numeric_default(Some("DMax(\"x\")"));
        assert_eq!(value, DefaultValue::Literal("0".into()));
        assert!(warning.is_some());
    }

    #[test]
    fn test_numeric_default_rejects_non_finite() {
        for raw in ["inf", "-Infinity", "NaN", "\"nan\""] {
            let (value, warning) = numeric_default(Some(raw));
            assert_eq!(value, DefaultValue::Literal("0".into()), "{}", raw);
            assert!(warning.is_some(), "{}", raw);
        }
        assert_eq!(numeric_default(Some("-1e3")).0, DefaultValue::Literal("-1e3".into()));
    }

    #[test]
    fn test_timestamp_default() {
        assert_eq!(
            timestamp_default(Some("=Now()")).0,
            DefaultValue::Keyword("CURRENT_TIMESTAMP")
        );
        assert_eq!(
            timestamp_default(None).0,
            DefaultValue::Literal(EPOCH_ZERO.into())
        );
        assert_eq!(
            timestamp_default(Some("#1/31/2020#")).0,
            DefaultValue::Literal("2020-01-31 00:00:00".into())
        );
        assert_eq!(
            timestamp_default(Some("2021-06-01 08:30:00")).0,
            DefaultValue::Literal("2021-06-01 08:30:00".into())
        );

        let (value, warning) = timestamp_default(Some("Date()+1"));
        assert_eq!(value, DefaultValue::Literal(EPOCH_ZERO.into()));
        assert!(warning.unwrap().contains("Date()+1"));
    }

    #[test]
    fn test_text_default() {
        assert_eq!(text_default(Some("\"n/a\"")), DefaultValue::Literal("n/a".into()));
        assert_eq!(text_default(None), DefaultValue::Literal(String::new()));
    }
}
