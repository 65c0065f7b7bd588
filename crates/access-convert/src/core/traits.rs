//! Core traits for the conversion engine.
//!
//! - [`SourceCatalog`]: reads schema and rows from the source database
//! - [`TypeMapper`]: maps source column metadata to a target column type
//! - [`Dialect`]: target SQL syntax, type table and constraint timing
//! - [`OutputSink`]: where statements and rows go (text file or live engine)
//!
//! The engine is written once against these traits. A target is a pairing of
//! one dialect with one sink.

use crate::constraints::{ForeignKeyFragment, IndexFragment};
use crate::error::Result;
use crate::sequence::SequenceReset;

use super::schema::{Column, Relationship, Table};
use super::value::{Row, SqlValue};

/// Forward-only row cursor over one table.
///
/// An `Err` item means the cursor itself broke and the table cannot be
/// read further. A single unreadable cell is reported inside the [`Row`].
pub type RowCursor<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// Read schema and data from a source database.
pub trait SourceCatalog {
    /// Names of all user tables. Order is not meaningful.
    fn table_names(&self) -> Result<Vec<String>>;

    /// Column and index metadata for one table.
    fn table(&self, name: &str) -> Result<Table>;

    /// All relationships in the catalog.
    fn relationships(&self) -> Result<Vec<Relationship>>;

    /// Open a forward cursor over the rows of a table.
    fn rows<'a>(&'a self, table: &str) -> Result<RowCursor<'a>>;
}

/// Nullability of a target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    Nullable,
    NotNull,
}

/// Default clause of a target column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// Quoted literal, stored unescaped.
    Literal(String),
    /// Unquoted keyword such as `CURRENT_TIMESTAMP`.
    Keyword(&'static str),
}

/// Per-column context a mapper cannot derive from the column alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnHints {
    /// The column references an auto-number parent column.
    pub references_auto_number: bool,
}

/// Target type descriptor produced by a [`TypeMapper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetType {
    /// Target SQL type name.
    pub sql_type: String,
    /// NULL / NOT NULL.
    pub nullability: Nullability,
    /// Default clause, if any.
    pub default: Option<DefaultValue>,
    /// Whether the dialect collation applies.
    pub needs_collation: bool,
    /// Decimal places for value-time rounding of floating values.
    pub value_precision: Option<u32>,
    /// Warning when the mapping loses information.
    pub warning: Option<String>,
}

impl TargetType {
    /// Create a nullable descriptor with no default.
    pub fn new(sql_type: impl Into<String>) -> Self {
        Self {
            sql_type: sql_type.into(),
            nullability: Nullability::Nullable,
            default: None,
            needs_collation: false,
            value_precision: None,
            warning: None,
        }
    }

    pub fn not_null_if(mut self, required: bool) -> Self {
        if required {
            self.nullability = Nullability::NotNull;
        }
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_collation(mut self) -> Self {
        self.needs_collation = true;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.value_precision = Some(precision);
        self
    }

    /// Attach the warning of a lossy mapping, if there is one.
    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }

    pub fn is_not_null(&self) -> bool {
        self.nullability == Nullability::NotNull
    }
}

/// Maps source column metadata to target types.
///
/// Implementations must be pure: the same column always maps to the same
/// descriptor, and row data is never consulted.
pub trait TypeMapper {
    /// Target dialect name.
    fn target_dialect(&self) -> &'static str;

    /// Map one column.
    fn map_column(&self, col: &Column, hints: ColumnHints) -> TargetType;
}

/// When relationship constraints are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintTiming {
    /// As separate statements after every table has been created and loaded.
    Deferred,
    /// As clauses of the owning table's CREATE statement.
    Inline,
}

/// A target column ready for DDL rendering.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    pub name: String,
    pub target: TargetType,
    pub is_auto_number: bool,
}

/// Everything a dialect needs to render one table's DDL.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    /// Primary key from the source indexes.
    pub primary_key: Option<IndexFragment>,
    /// Relationship clauses for dialects with inline constraint timing.
    pub foreign_keys: Vec<ForeignKeyFragment>,
}

impl TableDefinition {
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn auto_number_column(&self) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.is_auto_number)
    }
}

/// Target SQL syntax strategy.
pub trait Dialect {
    /// Dialect name (e.g., "mysql", "sqlite").
    fn name(&self) -> &'static str;

    /// Quote an identifier.
    fn quote_ident(&self, name: &str) -> String;

    /// Parameter placeholder for parameterized statements (1-based).
    fn param_placeholder(&self, index: usize) -> String;

    /// Type mapping policy.
    fn type_mapper(&self) -> &dyn TypeMapper;

    /// When relationship constraints are emitted.
    fn constraint_timing(&self) -> ConstraintTiming;

    /// Statements that open a conversion session.
    fn session_preamble(&self) -> Vec<String>;

    /// Statements that close a conversion session.
    fn session_footer(&self) -> Vec<String>;

    /// DROP TABLE IF EXISTS statement.
    fn drop_table(&self, table: &str) -> String;

    /// CREATE TABLE statement.
    fn create_table(&self, table: &TableDefinition) -> String;

    /// Statement for one same-table index, or `None` when the index is
    /// already covered by the CREATE statement.
    fn index_statement(&self, table: &TableDefinition, index: &IndexFragment) -> Option<String>;

    /// Deferred relationship statement, or `None` for inline timing.
    fn foreign_key_statement(&self, fk: &ForeignKeyFragment) -> Option<String>;

    /// Statement that moves a table's sequence to `reset.next_value`.
    fn sequence_reset(&self, reset: &SequenceReset) -> String;

    /// Whether [`Dialect::sequence_reset`] is only accepted once an index
    /// leads with the auto-number column.
    fn sequence_needs_key(&self) -> bool {
        false
    }

    /// Render a value as a SQL literal.
    fn literal(&self, value: &SqlValue<'_>) -> String;

    /// `INSERT INTO t (cols) VALUES` header shared by text batches.
    fn insert_header(&self, table: &str, columns: &[String]) -> String {
        let cols: Vec<String> = columns.iter().map(|c| self.quote_ident(c)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES",
            self.quote_ident(table),
            cols.join(", ")
        )
    }

    /// Single-row parameterized INSERT statement.
    fn insert_statement(&self, table: &str, columns: &[String]) -> String {
        let placeholders: Vec<String> = (1..=columns.len())
            .map(|i| self.param_placeholder(i))
            .collect();
        format!(
            "{} ({})",
            self.insert_header(table, columns),
            placeholders.join(", ")
        )
    }
}

/// Prepared INSERT shapes for one table.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub table: String,
    /// Header for multi-row text statements.
    pub header: String,
    /// Parameterized single-row statement.
    pub statement: String,
    /// Column names in value order.
    pub columns: Vec<String>,
}

impl InsertPlan {
    pub fn new<D: Dialect + ?Sized>(dialect: &D, table: &str, columns: &[String]) -> Self {
        Self {
            table: table.to_string(),
            header: dialect.insert_header(table, columns),
            statement: dialect.insert_statement(table, columns),
            columns: columns.to_vec(),
        }
    }
}

/// Result of writing one batch of rows.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Rows accepted by the target.
    pub written: u64,
    /// Recoverable per-row failures.
    pub failures: Vec<crate::error::ConvertError>,
}

/// Destination of a conversion run.
///
/// Errors returned by [`OutputSink::execute`] may be recoverable target write
/// failures (see [`crate::ConvertError::is_fatal`]); any other error aborts
/// the run.
pub trait OutputSink {
    /// Rows per call to [`OutputSink::write_batch`].
    fn batch_rows(&self) -> usize;

    /// Section comment. Sinks without a text stream ignore it.
    fn comment(&mut self, text: &str) -> Result<()>;

    /// Called once a table's CREATE went through, before any of its rows.
    fn begin_table(&mut self, _table: &Table) -> Result<()> {
        Ok(())
    }

    /// Write or execute one statement.
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Write or execute a batch of rows.
    fn write_batch(&mut self, plan: &InsertPlan, rows: &[Vec<SqlValue<'_>>])
        -> Result<BatchOutcome>;

    /// Flush and commit. Dropping a sink without calling this discards
    /// uncommitted output.
    fn finish(self) -> Result<()>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_type_builders() {
        let t = TargetType::new("VARCHAR(255)")
            .not_null_if(true)
            .with_default(DefaultValue::Literal(String::new()))
            .with_collation();
        assert_eq!(t.sql_type, "VARCHAR(255)");
        assert!(t.is_not_null());
        assert!(t.needs_collation);
        assert_eq!(t.default, Some(DefaultValue::Literal(String::new())));
        assert!(t.warning.is_none());
    }

    #[test]
    fn test_target_type_optional_not_null() {
        let t = TargetType::new("TEXT").not_null_if(false);
        assert_eq!(t.nullability, Nullability::Nullable);
    }

    #[test]
    fn test_target_type_warning() {
        let t = TargetType::new("DATETIME").with_warning(Some("default dropped".to_string()));
        assert_eq!(t.warning.as_deref(), Some("default dropped"));
        assert!(TargetType::new("TEXT").with_warning(None).warning.is_none());
    }
}
