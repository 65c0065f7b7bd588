//! Schema and metadata types for source tables, columns, indexes and relationships.
//!
//! These types are the catalog boundary: a source reader produces them and
//! the conversion engine never looks past them.

use serde::{Deserialize, Serialize};

/// Source column type category.
///
/// A closed set: every mapper matches on it exhaustively, so adding a
/// category is a compile error until each dialect handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Byte, Integer, Long Integer, Big Integer (distinguished by length).
    Integer,
    /// Single or Double (distinguished by length).
    Float,
    /// Fixed precision decimal.
    Decimal,
    /// Currency.
    Money,
    /// Yes/No.
    Boolean,
    /// Date/Time.
    Timestamp,
    /// Short text.
    Text,
    /// Long text.
    Memo,
    /// Replication ID.
    Guid,
    /// Raw bytes.
    Binary,
    /// Legacy embedded object.
    Ole,
    /// Multi-value attachment column.
    Complex,
}

impl SourceType {
    /// Categories whose cells go through the blob extractor.
    pub fn is_blob_container(self) -> bool {
        matches!(self, SourceType::Ole | SourceType::Complex)
    }

    pub fn is_textual(self) -> bool {
        matches!(self, SourceType::Text | SourceType::Memo | SourceType::Guid)
    }
}

/// Table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Column definitions, in row value order.
    pub columns: Vec<Column>,

    /// Index definitions, including the primary key.
    #[serde(default)]
    pub indexes: Vec<Index>,

    /// Row count reported by the source, for progress only.
    #[serde(default)]
    pub row_count: u64,
}

impl Table {
    /// Find a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of a column in row order.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// The tracked auto-number column. Only integer columns carry a
    /// sequence; if several are flagged, the first one wins.
    pub fn auto_number_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.is_auto_number && c.source_type == SourceType::Integer)
    }

    /// The primary key index, if the table has one.
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.is_primary_key)
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        self.primary_key().is_some()
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Source type category.
    #[serde(rename = "type")]
    pub source_type: SourceType,

    /// Declared length in bytes (integers, floats) or characters (text).
    #[serde(default)]
    pub length: u16,

    /// Numeric precision, 0 when not declared.
    #[serde(default)]
    pub precision: u8,

    /// Whether a value is required.
    #[serde(default)]
    pub required: bool,

    /// Raw default-value expression as stored by the source.
    #[serde(default)]
    pub default: Option<String>,

    /// Whether the source assigns values sequentially.
    #[serde(default, rename = "auto_number")]
    pub is_auto_number: bool,
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Indexed column names, in key order.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    #[serde(default, rename = "unique")]
    pub is_unique: bool,

    /// Whether the index is the primary key.
    #[serde(default, rename = "primary_key")]
    pub is_primary_key: bool,
}

/// Relationship (foreign key) metadata.
///
/// The owning table holds the foreign key; the referenced table is the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Constraint name.
    #[serde(default)]
    pub name: Option<String>,

    /// Owning (child) table.
    pub table: String,

    /// Owning column names.
    pub columns: Vec<String>,

    /// Referenced (parent) table.
    pub referenced_table: String,

    /// Referenced column names, positionally matching `columns`.
    pub referenced_columns: Vec<String>,

    #[serde(default)]
    pub cascade_delete: bool,

    #[serde(default)]
    pub cascade_update: bool,

    #[serde(default)]
    pub cascade_null_on_delete: bool,
}
