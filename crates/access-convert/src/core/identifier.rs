//! Identifier validation and quoting.
//!
//! Table and column names come straight from the source catalog and can
//! contain spaces, quotes and reserved words. Every name that reaches SQL
//! text goes through one of the quoting functions here.

use crate::error::{ConvertError, Result};

/// Maximum identifier length (MySQL allows 64 characters; SQLite has no limit).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes
/// - Identifiers exceeding maximum length
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConvertError::SchemaRead(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(ConvertError::SchemaRead(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ConvertError::SchemaRead(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a MySQL identifier using backticks.
///
/// Escapes backticks by doubling them and wraps in backticks.
///
/// ```ignore
/// assert_eq!(quote_mysql("users"), "`users`");
/// assert_eq!(quote_mysql("table`name"), "`table``name`");
/// ```
pub fn quote_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a SQLite identifier using double quotes.
///
/// Escapes double quotes by doubling them and wraps in double quotes.
pub fn quote_sqlite(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Validate every table, column and index name in a table.
pub fn validate_table_identifiers(table: &crate::core::Table) -> Result<()> {
    validate_identifier(&table.name)?;
    for col in &table.columns {
        validate_identifier(&col.name)
            .map_err(|e| ConvertError::SchemaRead(format!("table {}: {}", table.name, e)))?;
    }
    for idx in &table.indexes {
        validate_identifier(&idx.name)
            .map_err(|e| ConvertError::SchemaRead(format!("table {}: {}", table.name, e)))?;
    }
    Ok(())
}
