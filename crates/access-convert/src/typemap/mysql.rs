use crate::core::{Column, ColumnHints, DefaultValue, SourceType, TargetType, TypeMapper};

use super::{
    boolean_default, float_precision, numeric_default, text_default, timestamp_default,
};

/// Type mapper for MySQL dumps.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlTypeMapper;

impl MysqlTypeMapper {
    fn integer_type(col: &Column, hints: ColumnHints) -> String {
        if col.is_auto_number {
            return "INT(10) UNSIGNED".to_string();
        }
        let base = match col.length {
            1 => "TINYINT(3) UNSIGNED",
            2 => "SMALLINT(5)",
            8 => "BIGINT(20)",
            _ => "INT(10)",
        };
        if hints.references_auto_number && !base.ends_with("UNSIGNED") {
            format!("{} UNSIGNED", base)
        } else {
            base.to_string()
        }
    }
}

impl TypeMapper for MysqlTypeMapper {
    fn target_dialect(&self) -> &'static str {
        "mysql"
    }

    fn map_column(&self, col: &Column, hints: ColumnHints) -> TargetType {
        let raw_default = col.default.as_deref();

        match col.source_type {
            SourceType::Integer if col.is_auto_number => {
                TargetType::new(Self::integer_type(col, hints)).not_null_if(true)
            }
            SourceType::Integer => {
                let (default, warning) = numeric_default(raw_default);
                TargetType::new(Self::integer_type(col, hints))
                    .not_null_if(col.required)
                    .with_default(default)
                    .with_warning(warning)
            }
            SourceType::Float => {
                let sql_type = if col.length == 4 { "FLOAT" } else { "DOUBLE" };
                let (default, warning) = numeric_default(raw_default);
                TargetType::new(sql_type)
                    .not_null_if(col.required)
                    .with_default(default)
                    .with_precision(float_precision(col))
                    .with_warning(warning)
            }
            SourceType::Decimal | SourceType::Money => {
                let sql_type = if col.source_type == SourceType::Money {
                    "DECIMAL(15,4)"
                } else {
                    "DECIMAL(28,0)"
                };
                let (default, warning) = numeric_default(raw_default);
                TargetType::new(sql_type)
                    .not_null_if(col.required)
                    .with_default(default)
                    .with_warning(warning)
            }
            SourceType::Boolean => TargetType::new("TINYINT(3)")
                .not_null_if(col.required)
                .with_default(DefaultValue::Literal(boolean_default(raw_default).to_string())),
            SourceType::Timestamp => {
                let (default, warning) = timestamp_default(raw_default);
                TargetType::new("DATETIME")
                    .not_null_if(col.required)
                    .with_default(default)
                    .with_warning(warning)
            }
            SourceType::Text => {
                let len = if (1..=255).contains(&col.length) {
                    col.length
                } else {
                    255
                };
                TargetType::new(format!("VARCHAR({})", len))
                    .not_null_if(col.required)
                    .with_default(text_default(raw_default))
                    .with_collation()
            }
            SourceType::Guid => TargetType::new("VARCHAR(50)")
                .not_null_if(col.required)
                .with_default(text_default(raw_default))
                .with_collation(),
            SourceType::Memo => TargetType::new("TEXT")
                .not_null_if(col.required)
                .with_collation(),
            SourceType::Binary => TargetType::new("BLOB").not_null_if(col.required),
            SourceType::Ole | SourceType::Complex => {
                TargetType::new("LONGTEXT").not_null_if(col.required)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Nullability;

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
        MysqlTypeMapper.map_column(col, ColumnHints::default())
    }

    #[test]
    fn test_integer_widths() {
        assert_eq!(map(&make_test_column(SourceType::Integer, 1)).sql_type, "TINYINT(3) UNSIGNED");
        assert_eq!(map(&make_test_column(SourceType::Integer, 2)).sql_type, "SMALLINT(5)");
        assert_eq!(map(&make_test_column(SourceType::Integer, 4)).sql_type, "INT(10)");
        assert_eq!(map(&make_test_column(SourceType::Integer, 8)).sql_type, "BIGINT(20)");
    }

    #[test]
    fn test_integer_default_zero() {
        let t = map(&make_test_column(SourceType::Integer, 4));
        assert_eq!(t.default, Some(DefaultValue::Literal("0".into())));
        assert_eq!(t.nullability, Nullability::Nullable);
    }

    #[test]
    fn test_auto_number_is_not_null_without_default() {
        let mut col = make_test_column(SourceType::Integer, 4);
        col.is_auto_number = true;
        col.default = Some("5".into());
        let t = map(&col);
        assert_eq!(t.sql_type, "INT(10) UNSIGNED");
        assert!(t.is_not_null());
        assert!(t.default.is_none());
    }

    #[test]
    fn test_reference_to_auto_number_is_unsigned() {
        let col = make_test_column(SourceType::Integer, 4);
        let hints = ColumnHints {
            references_auto_number: true,
        };
        assert_eq!(MysqlTypeMapper.map_column(&col, hints).sql_type, "INT(10) UNSIGNED");

        let byte = make_test_column(SourceType::Integer, 1);
        assert_eq!(MysqlTypeMapper.map_column(&byte, hints).sql_type, "TINYINT(3) UNSIGNED");
    }

    #[test]
    fn test_float_and_decimal() {
        let single = map(&make_test_column(SourceType::Float, 4));
        assert_eq!(single.sql_type, "FLOAT");
        assert_eq!(single.value_precision, Some(2));
        assert_eq!(map(&make_test_column(SourceType::Float, 8)).sql_type, "DOUBLE");
        assert_eq!(map(&make_test_column(SourceType::Decimal, 16)).sql_type, "DECIMAL(28,0)");
        assert_eq!(map(&make_test_column(SourceType::Money, 8)).sql_type, "DECIMAL(15,4)");

        let mut precise = make_test_column(SourceType::Float, 8);
        precise.precision = 5;
        assert_eq!(map(&precise).value_precision, Some(5));
    }

    #[test]
    fn test_non_finite_float_default_becomes_zero() {
        let mut col = make_test_column(SourceType::Float, 8);
        col.default = Some("Infinity".into());
        let t = map(&col);
        assert_eq!(t.default, Some(DefaultValue::Literal("0".into())));
        assert!(t.warning.unwrap().contains("Infinity"));
    }

    #[test]
    fn test_boolean_defaults() {
        let mut col = make_test_column(SourceType::Boolean, 1);
        col.default = Some("Yes".into());
        assert_eq!(map(&col).default, Some(DefaultValue::Literal("1".into())));
        col.default = Some("No".into());
        assert_eq!(map(&col).default, Some(DefaultValue::Literal("0".into())));
        assert_eq!(map(&col).sql_type, "TINYINT(3)");
    }

    #[test]
    fn test_timestamp_now_is_keyword() {
        let mut col = make_test_column(SourceType::Timestamp, 8);
        col.default = Some("=Now()".into());
        assert_eq!(map(&col).default, Some(DefaultValue::Keyword("CURRENT_TIMESTAMP")));

        col.default = None;
        assert_eq!(
            map(&col).default,
            Some(DefaultValue::Literal("0000-00-00 00:00:00".into()))
        );
    }

    #[test]
    fn test_text_types_collate() {
        let mut text = make_test_column(SourceType::Text, 50);
        text.default = Some("\"unknown\"".into());
        let t = map(&text);
        assert_eq!(t.sql_type, "VARCHAR(50)");
        assert!(t.needs_collation);
        assert_eq!(t.default, Some(DefaultValue::Literal("unknown".into())));

        assert_eq!(map(&make_test_column(SourceType::Text, 0)).sql_type, "VARCHAR(255)");

        let memo = map(&make_test_column(SourceType::Memo, 0));
        assert_eq!(memo.sql_type, "TEXT");
        assert!(memo.needs_collation);
        assert!(memo.default.is_none());

        let guid = map(&make_test_column(SourceType::Guid, 16));
        assert_eq!(guid.sql_type, "VARCHAR(50)");
        assert_eq!(guid.default, Some(DefaultValue::Literal(String::new())));
    }

    #[test]
    fn test_blob_containers() {
        assert_eq!(map(&make_test_column(SourceType::Binary, 0)).sql_type, "BLOB");

        let mut ole = make_test_column(SourceType::Ole, 0);
        let t = map(&ole);
        assert_eq!(t.sql_type, "LONGTEXT");
        assert!(t.default.is_none());
        assert!(!t.is_not_null());

        ole.required = true;
        assert!(map(&ole).is_not_null());
        assert_eq!(map(&make_test_column(SourceType::Complex, 0)).sql_type, "LONGTEXT");
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let mut col = make_test_column(SourceType::Timestamp, 8);
        col.default = Some("#1/2/2003#".into());
        assert_eq!(map(&col), map(&col.clone()));
    }
}
