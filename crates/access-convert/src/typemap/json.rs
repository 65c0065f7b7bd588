use crate::core::{Column, ColumnHints, SourceType, TargetType, TypeMapper};

/// Type mapper for JSON exports.
///
/// The "type" is the JSON kind a cell of the column becomes. Defaults have no
/// meaning in a data export and floating values keep every digit.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTypeMapper;

impl TypeMapper for JsonTypeMapper {
    fn target_dialect(&self) -> &'static str {
        "json"
    }

    fn map_column(&self, col: &Column, _hints: ColumnHints) -> TargetType {
        let kind = match col.source_type {
            SourceType::Integer | SourceType::Float | SourceType::Decimal | SourceType::Money => {
                "number"
            }
            SourceType::Boolean => "boolean",
            SourceType::Timestamp
            | SourceType::Text
            | SourceType::Memo
            | SourceType::Guid
            | SourceType::Binary => "string",
            SourceType::Ole | SourceType::Complex => "array",
        };
        TargetType::new(kind).not_null_if(col.required || col.is_auto_number)
    }
}
