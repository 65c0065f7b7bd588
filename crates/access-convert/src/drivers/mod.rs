//! Target driver implementations.
//!
//! Each driver module provides:
//! - a `Dialect`: SQL syntax, type table and constraint timing for the target
//! - a writer implementing `OutputSink`
//!
//! - [`mysql`]: text dump for MySQL/MariaDB
//! - [`sqlite`]: direct execution against a SQLite database file
//! - [`json`]: data export of every table to one JSON file
//!
//! Dialects are dispatched through [`DialectImpl`] so the engine stays
//! generic without boxing.

pub mod json;
pub mod mysql;
pub mod sqlite;

pub use json::{JsonDialect, JsonWriter};
pub use mysql::{MysqlDialect, MysqlDumpWriter};
pub use sqlite::{SqliteDialect, SqliteWriter};

use crate::config::{Config, TargetKind};
use crate::constraints::{ForeignKeyFragment, IndexFragment};
use crate::core::{ConstraintTiming, Dialect, SqlValue, TableDefinition, TypeMapper};
use crate::sequence::SequenceReset;

/// Enum-based static dispatch for dialects.
///
/// The compiler generates a match instead of vtable dispatch.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mysql(MysqlDialect),
    Sqlite(SqliteDialect),
    Json(JsonDialect),
}

macro_rules! dispatch {
    ($self:ident, $d:ident => $e:expr) => {
        match $self {
            DialectImpl::Mysql($d) => $e,
            DialectImpl::Sqlite($d) => $e,
            DialectImpl::Json($d) => $e,
        }
    };
}

impl Dialect for DialectImpl {
    fn name(&self) -> &'static str {
        dispatch!(self, d => d.name())
    }

    fn quote_ident(&self, name: &str) -> String {
        dispatch!(self, d => d.quote_ident(name))
    }

    fn param_placeholder(&self, index: usize) -> String {
        dispatch!(self, d => d.param_placeholder(index))
    }

    fn type_mapper(&self) -> &dyn TypeMapper {
        dispatch!(self, d => d.type_mapper())
    }

    fn constraint_timing(&self) -> ConstraintTiming {
        dispatch!(self, d => d.constraint_timing())
    }

    fn session_preamble(&self) -> Vec<String> {
        dispatch!(self, d => d.session_preamble())
    }

    fn session_footer(&self) -> Vec<String> {
        dispatch!(self, d => d.session_footer())
    }

    fn drop_table(&self, table: &str) -> String {
        dispatch!(self, d => d.drop_table(table))
    }

    fn create_table(&self, table: &TableDefinition) -> String {
        dispatch!(self, d => d.create_table(table))
    }

    fn index_statement(&self, table: &TableDefinition, index: &IndexFragment) -> Option<String> {
        dispatch!(self, d => d.index_statement(table, index))
    }

    fn foreign_key_statement(&self, fk: &ForeignKeyFragment) -> Option<String> {
        dispatch!(self, d => d.foreign_key_statement(fk))
    }

    fn sequence_reset(&self, reset: &SequenceReset) -> String {
        dispatch!(self, d => d.sequence_reset(reset))
    }

    fn sequence_needs_key(&self) -> bool {
        dispatch!(self, d => d.sequence_needs_key())
    }

    fn literal(&self, value: &SqlValue<'_>) -> String {
        dispatch!(self, d => d.literal(value))
    }
}

impl DialectImpl {
    /// Create the dialect for a configured target.
    pub fn from_config(config: &Config) -> Self {
        match config.target.r#type {
            TargetKind::MysqlDump => DialectImpl::Mysql(MysqlDialect::from_config(&config.target)),
            TargetKind::Sqlite => DialectImpl::Sqlite(SqliteDialect::new()),
            TargetKind::Json => DialectImpl::Json(JsonDialect::new()),
        }
    }
}
