//! SQLite driver.
//!
//! - [`SqliteDialect`]: SQL syntax with inline relationship constraints
//! - [`SqliteWriter`]: executes statements against a database file
//!
//! SQLite cannot add a foreign key to an existing table, so relationships
//! are part of each child table's CREATE statement.

mod dialect;
mod writer;

pub use dialect::SqliteDialect;
pub use writer::SqliteWriter;
