use crate::core::{Column, ColumnHints, DefaultValue, SourceType, TargetType, TypeMapper};

use super::{
    boolean_default, float_precision, numeric_default, text_default, timestamp_default,
};

/// Type mapper for SQLite databases.
///
/// SQLite has no unsigned integers and no column collations for our
/// purposes, so the unsigned hint and collation flag are never set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTypeMapper;

impl TypeMapper for SqliteTypeMapper {
    fn target_dialect(&self) -> &'static str {
        "sqlite"
    }

    fn map_column(&self, col: &Column, _hints: ColumnHints) -> TargetType {
        let raw_default = col.default.as_deref();

        let (sql_type, default, warning) = match col.source_type {
            SourceType::Integer if col.is_auto_number => {
                return TargetType::new("INTEGER").not_null_if(true);
            }
            SourceType::Integer => {
                let (d, w) = numeric_default(raw_default);
                ("INTEGER".to_string(), Some(d), w)
            }
            SourceType::Float => {
                let (d, w) = numeric_default(raw_default);
                let sql_type = if col.length == 4 { "FLOAT" } else { "DOUBLE" };
                return TargetType::new(sql_type)
                    .not_null_if(col.required)
                    .with_default(d)
                    .with_precision(float_precision(col))
                    .with_warning(w);
            }
            SourceType::Decimal => {
                let (d, w) = numeric_default(raw_default);
                ("DECIMAL(28,0)".to_string(), Some(d), w)
            }
            SourceType::Money => {
                let (d, w) = numeric_default(raw_default);
                ("DECIMAL(15,4)".to_string(), Some(d), w)
            }
            SourceType::Boolean => (
                "TINYINT".to_string(),
                Some(DefaultValue::Literal(boolean_default(raw_default).to_string())),
                None,
            ),
            SourceType::Timestamp => {
                let (d, w) = timestamp_default(raw_default);
                ("DATETIME".to_string(), Some(d), w)
            }
            SourceType::Text => {
                let len = if (1..=255).contains(&col.length) {
                    col.length
                } else {
                    255
                };
                (format!("VARCHAR({})", len), Some(text_default(raw_default)), None)
            }
            SourceType::Guid => ("VARCHAR(50)".to_string(), Some(text_default(raw_default)), None),
            SourceType::Memo | SourceType::Ole | SourceType::Complex => {
                ("TEXT".to_string(), None, None)
            }
            SourceType::Binary => ("BLOB".to_string(), None, None),
        };

        let mut t = TargetType::new(sql_type)
            .not_null_if(col.required)
            .with_warning(warning);
        t.default = default;
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_column(source_type: SourceType, length: u16) -> Column {
        Column {
            name: "c".to_string(),
            source_type,
            length,
            precision: 0,
            required: false,
            default: None,
            is_auto_number: false,
        }
    }

    fn map(col: &Column) -> TargetType {
        SqliteTypeMapper.map_column(col, ColumnHints::default())
    }

    #[test]
    fn test_integer_types() {
        for len in [1, 2, 4, 8] {
            assert_eq!(map(&make_test_column(SourceType::Integer, len)).sql_type, "INTEGER");
        }
        let hinted = SqliteTypeMapper.map_column(
            &make_test_column(SourceType::Integer, 4),
            ColumnHints {
                references_auto_number: true,
            },
        );
        assert_eq!(hinted.sql_type, "INTEGER");
    }

    #[test]
    fn test_auto_number() {
        let mut col = make_test_column(SourceType::Integer, 4);
        col.is_auto_number = true;
        let t = map(&col);
        assert_eq!(t.sql_type, "INTEGER");
        assert!(t.is_not_null());
        assert!(t.default.is_none());
    }

    #[test]
    fn test_no_collation() {
        for st in [SourceType::Text, SourceType::Memo, SourceType::Guid] {
            assert!(!map(&make_test_column(st, 10)).needs_collation);
        }
    }

    #[test]
    fn test_category_types() {
        assert_eq!(map(&make_test_column(SourceType::Float, 4)).sql_type, "FLOAT");
        assert_eq!(map(&make_test_column(SourceType::Float, 8)).sql_type, "DOUBLE");
        assert_eq!(map(&make_test_column(SourceType::Money, 8)).sql_type, "DECIMAL(15,4)");
        assert_eq!(map(&make_test_column(SourceType::Boolean, 1)).sql_type, "TINYINT");
        assert_eq!(map(&make_test_column(SourceType::Timestamp, 8)).sql_type, "DATETIME");
        assert_eq!(map(&make_test_column(SourceType::Guid, 16)).sql_type, "VARCHAR(50)");
        assert_eq!(map(&make_test_column(SourceType::Binary, 0)).sql_type, "BLOB");
        assert_eq!(map(&make_test_column(SourceType::Ole, 0)).sql_type, "TEXT");
        assert_eq!(map(&make_test_column(SourceType::Complex, 0)).sql_type, "TEXT");
    }

    #[test]
    fn test_boolean_default() {
        let mut col = make_test_column(SourceType::Boolean, 1);
        col.default = Some("Yes".into());
        assert_eq!(map(&col).default, Some(DefaultValue::Literal("1".into())));
    }

    #[test]
    fn test_float_precision() {
        assert_eq!(map(&make_test_column(SourceType::Float, 8)).value_precision, Some(2));
    }
}
