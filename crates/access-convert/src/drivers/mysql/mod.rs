//! MySQL/MariaDB text dump driver.
//!
//! - [`MysqlDialect`]: SQL syntax, type table and deferred constraints
//! - [`MysqlDumpWriter`]: writes statements to a `.sql` file
//!
//! The dump loads with the stock client:
//!
//! ```text
//! mysql -u user -p database < northwind.sql
//! ```

mod dialect;
mod writer;

pub use dialect::MysqlDialect;
pub use writer::MysqlDumpWriter;
