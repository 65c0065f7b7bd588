//! JSON catalog snapshot reader.
//!
//! A snapshot holds table metadata, rows and relationships in one document.
//! Cells are stored as plain JSON and decoded by the column's category when
//! the row cursor reaches them.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::core::{
    validate_table_identifiers, Attachment, CellValue, Column, OleContent, Relationship, Row,
    RowCursor, SourceCatalog, SourceType, Table,
};
use crate::error::{ConvertError, Result};

const SIMPLE_PACKAGE: &str = "simple_package";

#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    tables: Vec<SnapshotTable>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
struct SnapshotTable {
    #[serde(flatten)]
    table: Table,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct OleCell {
    kind: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentCell {
    name: String,
    #[serde(default, rename = "type")]
    file_type: Option<String>,
    #[serde(default)]
    data: String,
}

/// Catalog backed by a JSON snapshot document.
#[derive(Debug)]
pub struct SnapshotCatalog {
    tables: Vec<SnapshotTable>,
    relationships: Vec<Relationship>,
}

impl SnapshotCatalog {
    /// Read a snapshot file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConvertError::SchemaRead(format!("cannot read catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json(&content)?;
        info!(
            "Loaded catalog {} ({} tables, {} relationships)",
            path.display(),
            catalog.tables.len(),
            catalog.relationships.len()
        );
        Ok(catalog)
    }

    /// Parse a snapshot document.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: SnapshotDocument = serde_json::from_str(json)
            .map_err(|e| ConvertError::SchemaRead(format!("invalid catalog snapshot: {}", e)))?;

        let mut seen = HashSet::new();
        let mut tables = Vec::with_capacity(doc.tables.len());
        for mut entry in doc.tables {
            validate_table_identifiers(&entry.table)?;
            if !seen.insert(entry.table.name.clone()) {
                return Err(ConvertError::SchemaRead(format!(
                    "duplicate table '{}' in catalog",
                    entry.table.name
                )));
            }
            entry.table.row_count = entry.rows.len() as u64;
            tables.push(entry);
        }

        Ok(Self {
            tables,
            relationships: doc.relationships,
        })
    }

    fn entry(&self, name: &str) -> Result<&SnapshotTable> {
        self.tables
            .iter()
            .find(|t| t.table.name == name)
            .ok_or_else(|| ConvertError::SchemaRead(format!("table '{}' not found", name)))
    }
}

impl SourceCatalog for SnapshotCatalog {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.table.name.clone()).collect())
    }

    fn table(&self, name: &str) -> Result<Table> {
        Ok(self.entry(name)?.table.clone())
    }

    fn relationships(&self) -> Result<Vec<Relationship>> {
        Ok(self.relationships.clone())
    }

    fn rows<'a>(&'a self, table: &str) -> Result<RowCursor<'a>> {
        let entry = self.entry(table)?;
        debug!("Opening cursor on {} ({} rows)", table, entry.rows.len());
        let columns = &entry.table.columns;

        Ok(Box::new(entry.rows.iter().map(move |cells| {
            let values = columns
                .iter()
                .enumerate()
                .map(|(i, col)| match cells.get(i) {
                    Some(v) => decode_cell(col, v),
                    None => CellValue::Unreadable(format!("row has no value for column {}", col.name)),
                })
                .collect();
            Ok(Row::new(values))
        })))
    }
}

/// Decode one JSON cell by its column category.
pub(crate) fn decode_cell(col: &Column, value: &Value) -> CellValue {
    if value.is_null() {
        return CellValue::Null;
    }

    let decoded = match col.source_type {
        SourceType::Integer => decode_integer(value),
        SourceType::Float => value.as_f64().map(CellValue::Float),
        SourceType::Decimal | SourceType::Money => decode_decimal(value).map(CellValue::Decimal),
        SourceType::Boolean => decode_boolean(value).map(CellValue::Bool),
        SourceType::Timestamp => value.as_str().and_then(parse_timestamp).map(CellValue::DateTime),
        SourceType::Text | SourceType::Memo | SourceType::Guid => {
            value.as_str().map(|s| CellValue::Text(s.to_string()))
        }
        SourceType::Binary => value
            .as_str()
            .and_then(|s| STANDARD.decode(s).ok())
            .map(CellValue::Bytes),
        SourceType::Ole => decode_ole(value),
        SourceType::Complex => decode_attachments(value),
    };

    decoded.unwrap_or_else(|| {
        CellValue::Unreadable(format!(
            "cannot decode {} as {:?} for column {}",
            value, col.source_type, col.name
        ))
    })
}

fn decode_integer(value: &Value) -> Option<CellValue> {
    if let Some(i) = value.as_i64() {
        return Some(CellValue::Int(i));
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| CellValue::Int(f as i64))
}

fn decode_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn decode_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64()? {
            0 => Some(false),
            1 | -1 => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn decode_ole(value: &Value) -> Option<CellValue> {
    let cell: OleCell = serde_json::from_value(value.clone()).ok()?;
    if cell.kind != SIMPLE_PACKAGE {
        return Some(CellValue::Ole(OleContent::Unsupported { kind: cell.kind }));
    }
    let data = STANDARD.decode(cell.data.unwrap_or_default()).ok()?;
    Some(CellValue::Ole(OleContent::SimplePackage {
        file_name: cell.file_name.unwrap_or_else(|| "package".to_string()),
        data,
    }))
}

fn decode_attachments(value: &Value) -> Option<CellValue> {
    let cells: Vec<AttachmentCell> = serde_json::from_value(value.clone()).ok()?;
    let attachments = cells
        .into_iter()
        .map(|c| {
            Some(Attachment {
                name: c.name,
                file_type: c.file_type,
                data: STANDARD.decode(c.data).ok()?,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(CellValue::Attachments(attachments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SNAPSHOT: &str = r#"{
        "tables": [
            {
                "name": "Orders",
                "columns": [
                    {"name": "OrderId", "type": "integer", "length": 4, "auto_number": true, "required": true},
                    {"name": "Total", "type": "money", "length": 8},
                    {"name": "Placed", "type": "timestamp", "length": 8}
                ],
                "indexes": [{"name": "PrimaryKey", "columns": ["OrderId"], "unique": true, "primary_key": true}],
                "rows": [
                    [1, "12.5000", "2024-01-02 03:04:05"],
                    [2, 7, "2024-01-03"],
                    [3]
                ]
            },
            {"name": "customers", "columns": [{"name": "Id", "type": "integer", "length": 4}], "rows": []}
        ],
        "relationships": [
            {"name": "rel", "table": "Orders", "columns": ["OrderId"], "referenced_table": "customers",
             "referenced_columns": ["Id"], "cascade_delete": true}
        ]
    }"#;

    fn make_test_column(source_type: SourceType) -> Column {
        Column {
            name: "c".to_string(),
            source_type,
            length: 4,
            precision: 0,
            required: false,
            default: None,
            is_auto_number: false,
        }
    }

    #[test]
    fn test_load_metadata() {
        let catalog = SnapshotCatalog::from_json(SNAPSHOT).unwrap();
        assert_eq!(catalog.table_names().unwrap(), vec!["Orders", "customers"]);

        let orders = catalog.table("Orders").unwrap();
        assert_eq!(orders.row_count, 3);
        assert_eq!(orders.auto_number_column().unwrap().name, "OrderId");
        assert!(orders.has_pk());

        let rels = catalog.relationships().unwrap();
        assert_eq!(rels.len(), 1);
        assert!(rels[0].cascade_delete);
        assert!(!rels[0].cascade_update);
    }

    #[test]
    fn test_rows_decode_and_short_rows() {
        let catalog = SnapshotCatalog::from_json(SNAPSHOT).unwrap();
        let rows: Vec<Row> = catalog.rows("Orders").unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].get(0), Ok(&CellValue::Int(1)));
        assert_eq!(
            rows[0].get(1),
            Ok(&CellValue::Decimal(Decimal::from_str("12.5000").unwrap()))
        );
        let placed = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(rows[1].get(2), Ok(&CellValue::DateTime(placed)));

        assert!(rows[2].get(1).is_err());
        assert!(rows[2].get(2).is_err());
    }

    #[test]
    fn test_unknown_table() {
        let catalog = SnapshotCatalog::from_json(SNAPSHOT).unwrap();
        assert!(matches!(catalog.table("Nope"), Err(ConvertError::SchemaRead(_))));
        assert!(catalog.rows("Nope").is_err());
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let json = r#"{"tables": [
            {"name": "T", "columns": []},
            {"name": "T", "columns": []}
        ]}"#;
        assert!(matches!(SnapshotCatalog::from_json(json), Err(ConvertError::SchemaRead(_))));
    }

    #[test]
    fn test_invalid_document_is_schema_error() {
        assert!(matches!(
            SnapshotCatalog::from_json("{\"tables\": 3}"),
            Err(ConvertError::SchemaRead(_))
        ));
    }

    #[test]
    fn test_missing_file_is_schema_error() {
        let err = SnapshotCatalog::load("/nonexistent/catalog.json").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_decode_booleans() {
        let col = make_test_column(SourceType::Boolean);
        assert_eq!(decode_cell(&col, &json!(true)), CellValue::Bool(true));
        assert_eq!(decode_cell(&col, &json!(-1)), CellValue::Bool(true));
        assert_eq!(decode_cell(&col, &json!(0)), CellValue::Bool(false));
        assert!(matches!(decode_cell(&col, &json!(7)), CellValue::Unreadable(_)));
    }

    #[test]
    fn test_decode_type_mismatch_is_unreadable() {
        assert!(matches!(
            decode_cell(&make_test_column(SourceType::Integer), &json!("abc")),
            CellValue::Unreadable(_)
        ));
        assert!(matches!(
            decode_cell(&make_test_column(SourceType::Binary), &json!("***")),
            CellValue::Unreadable(_)
        ));
        assert_eq!(
            decode_cell(&make_test_column(SourceType::Text), &Value::Null),
            CellValue::Null
        );
    }

    #[test]
    fn test_decode_blob_containers() {
        let ole = decode_cell(
            &make_test_column(SourceType::Ole),
            &json!({"kind": "simple_package", "file_name": "a.doc", "data": "aGk="}),
        );
        assert_eq!(
            ole,
            CellValue::Ole(OleContent::SimplePackage {
                file_name: "a.doc".into(),
                data: b"hi".to_vec()
            })
        );

        let linked = decode_cell(&make_test_column(SourceType::Ole), &json!({"kind": "link"}));
        assert_eq!(
            linked,
            CellValue::Ole(OleContent::Unsupported { kind: "link".into() })
        );

        let att = decode_cell(
            &make_test_column(SourceType::Complex),
            &json!([{"name": "x.txt", "type": "txt", "data": "eA=="}]),
        );
        match att {
            CellValue::Attachments(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].data, b"x");
                assert_eq!(items[0].file_type.as_deref(), Some("txt"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
