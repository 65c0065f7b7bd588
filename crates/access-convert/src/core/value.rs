//! Cell and SQL value types.
//!
//! [`CellValue`] is what a source row cursor yields for one cell.
//! [`SqlValue`] is what the engine hands to an output sink after conversion.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Format used for timestamp literals in every dialect.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One file stored in a multi-value attachment cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Original file name, including extension.
    pub name: String,
    /// File type tag as recorded by the source.
    pub file_type: Option<String>,
    /// File contents.
    pub data: Vec<u8>,
}

/// Content of a legacy embedded object cell.
#[derive(Debug, Clone, PartialEq)]
pub enum OleContent {
    /// A packaged file: the only form that can be extracted.
    SimplePackage { file_name: String, data: Vec<u8> },
    /// Linked files, embedded documents and anything else.
    Unsupported { kind: String },
}

/// A typed cell value produced by a source row cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    Text(String),
    Bytes(Vec<u8>),
    Attachments(Vec<Attachment>),
    Ole(OleContent),
    /// The source could not produce a value for this cell.
    Unreadable(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "boolean",
            CellValue::Int(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::Decimal(_) => "decimal",
            CellValue::DateTime(_) => "timestamp",
            CellValue::Text(_) => "text",
            CellValue::Bytes(_) => "bytes",
            CellValue::Attachments(_) => "attachments",
            CellValue::Ole(_) => "ole",
            CellValue::Unreadable(_) => "unreadable",
        }
    }
}

/// One row from a source cursor, values in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<CellValue>,
}

impl Row {
    pub fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }

    /// Read a cell. An unreadable or missing cell is reported as `Err` with
    /// the reason; the row itself stays usable.
    pub fn get(&self, idx: usize) -> std::result::Result<&CellValue, String> {
        match self.values.get(idx) {
            Some(CellValue::Unreadable(reason)) => Err(reason.clone()),
            Some(value) => Ok(value),
            None => Err(format!("no value at position {}", idx)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// SQL value ready for a target sink.
///
/// Uses `Cow` for string and byte data so sidecar JSON and borrowed cell
/// text can be passed without copying.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
}

impl<'a> SqlValue<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> SqlValue<'static> {
        match self {
            SqlValue::Null => SqlValue::Null,
            SqlValue::Bool(v) => SqlValue::Bool(v),
            SqlValue::I64(v) => SqlValue::I64(v),
            SqlValue::F64(v) => SqlValue::F64(v),
            SqlValue::Decimal(v) => SqlValue::Decimal(v),
            SqlValue::DateTime(v) => SqlValue::DateTime(v),
            SqlValue::Text(v) => SqlValue::Text(Cow::Owned(v.into_owned())),
            SqlValue::Bytes(v) => SqlValue::Bytes(Cow::Owned(v.into_owned())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Timestamp rendered without quotes.
    pub fn format_datetime(value: &NaiveDateTime) -> String {
        value.format(DATETIME_FORMAT).to_string()
    }
}

impl From<bool> for SqlValue<'_> {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i64> for SqlValue<'_> {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue<'_> {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<Decimal> for SqlValue<'_> {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<String> for SqlValue<'_> {
    fn from(v: String) -> Self {
        SqlValue::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for SqlValue<'a> {
    fn from(v: &'a str) -> Self {
        SqlValue::Text(Cow::Borrowed(v))
    }
}

impl<T> From<Option<T>> for SqlValue<'_>
where
    T: Into<SqlValue<'static>>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_row_get_reports_unreadable() {
        let row = Row::new(vec![
            CellValue::Int(1),
            CellValue::Unreadable("bad page".into()),
        ]);
        assert_eq!(row.get(0), Ok(&CellValue::Int(1)));
        assert_eq!(row.get(1), Err("bad page".to_string()));
        assert!(row.get(2).unwrap_err().contains("position 2"));
    }

    #[test]
    fn test_into_owned() {
        let text = String::from("hello");
        let borrowed = SqlValue::from(text.as_str());
        let owned: SqlValue<'static> = borrowed.into_owned();
        assert_eq!(owned, SqlValue::Text(Cow::Owned("hello".into())));
    }

    #[test]
    fn test_option_conversion() {
        assert!(SqlValue::from(None::<i64>).is_null());
        assert_eq!(SqlValue::from(Some(5i64)), SqlValue::I64(5));
    }

    #[test]
    fn test_format_datetime() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(7, 5, 9)
            .unwrap();
        assert_eq!(SqlValue::format_datetime(&dt), "2024-02-29 07:05:09");
    }
}
