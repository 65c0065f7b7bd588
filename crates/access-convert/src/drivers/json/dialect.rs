//! JSON export dialect.
//!
//! A data export has no DDL. The statements rendered here only describe
//! each step for the debug log; the writer does not act on them.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Number, Value};

use crate::constraints::{ForeignKeyFragment, IndexFragment};
use crate::core::{ConstraintTiming, Dialect, SqlValue, TableDefinition, TypeMapper};
use crate::sequence::SequenceReset;
use crate::typemap::JsonTypeMapper;

/// Convert one value to JSON.
///
/// Decimals stay numbers unless that would change their digits, in which
/// case they are written as strings. Non-finite floats become `null`.
pub fn json_value(value: &SqlValue<'_>) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Bool(*b),
        SqlValue::I64(v) => Value::from(*v),
        SqlValue::F64(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Decimal(d) => {
            let text = d.normalize().to_string();
            match Number::from_str(&text) {
                Ok(n) if n.to_string() == text => Value::Number(n),
                _ => Value::String(text),
            }
        }
        SqlValue::DateTime(v) => Value::String(SqlValue::format_datetime(v)),
        SqlValue::Text(s) => Value::String(s.to_string()),
        SqlValue::Bytes(b) if b.is_empty() => Value::Null,
        SqlValue::Bytes(b) => Value::String(STANDARD.encode(b.as_ref())),
    }
}

/// JSON export dialect.
#[derive(Debug, Clone, Default)]
pub struct JsonDialect {
    mapper: JsonTypeMapper,
}

impl JsonDialect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dialect for JsonDialect {
    fn name(&self) -> &'static str {
        "json"
    }

    fn quote_ident(&self, name: &str) -> String {
        Value::String(name.to_string()).to_string()
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn type_mapper(&self) -> &dyn TypeMapper {
        &self.mapper
    }

    fn constraint_timing(&self) -> ConstraintTiming {
        ConstraintTiming::Inline
    }

    fn session_preamble(&self) -> Vec<String> {
        Vec::new()
    }

    fn session_footer(&self) -> Vec<String> {
        Vec::new()
    }

    fn drop_table(&self, table: &str) -> String {
        format!("replace table {}", self.quote_ident(table))
    }

    fn create_table(&self, table: &TableDefinition) -> String {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("{}: {}", self.quote_ident(&c.name), c.target.sql_type))
            .collect();
        format!("table {} {{{}}}", self.quote_ident(&table.name), columns.join(", "))
    }

    fn index_statement(&self, _table: &TableDefinition, _index: &IndexFragment) -> Option<String> {
        None
    }

    fn foreign_key_statement(&self, _fk: &ForeignKeyFragment) -> Option<String> {
        None
    }

    fn sequence_reset(&self, reset: &SequenceReset) -> String {
        format!(
            "next {}.{} is {}",
            self.quote_ident(&reset.table),
            self.quote_ident(&reset.column),
            reset.next_value
        )
    }

    fn literal(&self, value: &SqlValue<'_>) -> String {
        json_value(value).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::borrow::Cow;

    #[test]
    fn test_literals() {
        let d = JsonDialect::new();
        assert_eq!(d.literal(&SqlValue::Null), "null");
        assert_eq!(d.literal(&SqlValue::Bool(true)), "true");
        assert_eq!(d.literal(&SqlValue::I64(-7)), "-7");
        assert_eq!(d.literal(&SqlValue::F64(3.14159)), "3.14159");
        assert_eq!(d.literal(&SqlValue::F64(f64::NAN)), "null");
        assert_eq!(d.literal(&SqlValue::Text(Cow::Borrowed("say \"hi\""))), r#""say \"hi\"""#);
        assert_eq!(d.literal(&SqlValue::Bytes(Cow::Owned(vec![1, 2]))), r#""AQI=""#);

        let dt = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap().and_hms_opt(9, 5, 0).unwrap();
        assert_eq!(d.literal(&SqlValue::DateTime(dt)), r#""2020-01-31 09:05:00""#);
    }

    #[test]
    fn test_decimal_keeps_digits() {
        let money = Decimal::new(125_000, 4);
        assert_eq!(json_value(&SqlValue::Decimal(money)), serde_json::json!(12.5));

        let wide = Decimal::from_str("1234567890123456789012.5").unwrap();
        assert_eq!(
            json_value(&SqlValue::Decimal(wide)),
            Value::String("1234567890123456789012.5".to_string())
        );
    }

    #[test]
    fn test_no_constraints() {
        let d = JsonDialect::new();
        assert_eq!(d.constraint_timing(), ConstraintTiming::Inline);
        assert!(!d.sequence_needs_key());
        assert!(d.session_preamble().is_empty());
        assert_eq!(d.quote_ident("a\"b"), r#""a\"b""#);
    }
}
