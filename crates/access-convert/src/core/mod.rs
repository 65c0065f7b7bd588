//! Core abstractions shared by every part of the engine.

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use identifier::{quote_mysql, quote_sqlite, validate_identifier, validate_table_identifiers};
pub use schema::{Column, Index, Relationship, SourceType, Table};
pub use traits::{
    BatchOutcome, ColumnDefinition, ColumnHints, ConstraintTiming, DefaultValue, Dialect,
    InsertPlan, Nullability, OutputSink, RowCursor, SourceCatalog, TableDefinition, TargetType,
    TypeMapper,
};
pub use value::{Attachment, CellValue, OleContent, Row, SqlValue, DATETIME_FORMAT};
