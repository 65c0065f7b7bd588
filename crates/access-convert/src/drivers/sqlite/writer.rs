//! SQLite target writer.
//!
//! Implements `OutputSink` over a rusqlite connection. The whole run is one
//! transaction: it is opened on create and committed by `finish`. A writer
//! dropped before `finish` closes the connection, which rolls the open
//! transaction back.

use std::path::{Path, PathBuf};

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use tracing::{debug, info};

use crate::core::{BatchOutcome, InsertPlan, OutputSink, SqlValue};
use crate::error::{ConvertError, Result};

impl ToSql for SqlValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SqlValue::I64(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::F64(v) if v.is_finite() => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::F64(_) => ToSqlOutput::Owned(Value::Null),
            // Stored as text so no precision is lost to REAL.
            SqlValue::Decimal(v) => ToSqlOutput::Owned(Value::Text(v.to_string())),
            SqlValue::DateTime(v) => ToSqlOutput::Owned(Value::Text(SqlValue::format_datetime(v))),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Bytes(b) if b.is_empty() => ToSqlOutput::Owned(Value::Null),
            SqlValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b.as_ref())),
        })
    }
}

/// SQLite target writer.
pub struct SqliteWriter {
    conn: Connection,
    path: PathBuf,
    batch_size: usize,
}

impl SqliteWriter {
    /// Create a fresh database at `path`, replacing any existing file, and
    /// open the run transaction.
    pub fn create(path: &Path, batch_size: usize) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| {
                ConvertError::output_sink(e, format!("removing existing {}", path.display()))
            })?;
            debug!("Removed existing database {}", path.display());
        }

        let conn = Connection::open(path)
            .map_err(|e| ConvertError::output_sink(e, format!("opening {}", path.display())))?;
        Self::from_connection(conn, path, batch_size)
    }

    /// Wrap an open connection (an in-memory database in tests).
    pub fn from_connection(conn: Connection, path: &Path, batch_size: usize) -> Result<Self> {
        // Tables load in name order, so children may precede their parents.
        conn.execute_batch("PRAGMA foreign_keys = OFF; BEGIN;")
            .map_err(|e| ConvertError::output_sink(e, format!("starting transaction on {}", path.display())))?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            batch_size: batch_size.max(1),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl OutputSink for SqliteWriter {
    fn batch_rows(&self) -> usize {
        self.batch_size
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        debug!("-- {}", text);
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        debug!("Executing: {}", sql);
        self.conn
            .execute_batch(sql)
            .map_err(|e| ConvertError::target_write(sql, e))
    }

    fn write_batch(&mut self, plan: &InsertPlan, rows: &[Vec<SqlValue<'_>>]) -> Result<BatchOutcome> {
        let mut stmt = self
            .conn
            .prepare_cached(&plan.statement)
            .map_err(|e| ConvertError::target_write(plan.statement.as_str(), e))?;

        let mut outcome = BatchOutcome::default();
        for row in rows {
            match stmt.execute(params_from_iter(row.iter())) {
                Ok(_) => outcome.written += 1,
                Err(e) => outcome
                    .failures
                    .push(ConvertError::target_write(plan.statement.as_str(), e)),
            }
        }

        debug!(
            "{}: inserted {} of {} rows",
            plan.table,
            outcome.written,
            rows.len()
        );
        Ok(outcome)
    }

    fn finish(self) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(|e| {
            ConvertError::output_sink(e, format!("committing {}", self.path.display()))
        })?;
        self.conn
            .close()
            .map_err(|(_, e)| ConvertError::output_sink(e, format!("closing {}", self.path.display())))?;

        info!("Wrote database {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::SqliteDialect;
    use tempfile::TempDir;

    fn make_test_plan() -> InsertPlan {
        InsertPlan::new(&SqliteDialect::new(), "T", &["id".to_string(), "name".to_string()])
    }

    #[test]
    fn test_round_trip_and_row_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.sqlite3");
        let mut w = SqliteWriter::create(&path, 500).unwrap();
        w.execute("CREATE TABLE \"T\" (\"id\" INTEGER PRIMARY KEY, \"name\" TEXT NOT NULL)")
            .unwrap();

        let outcome = w
            .write_batch(
                &make_test_plan(),
                &[
                    vec![SqlValue::I64(1), SqlValue::from("a")],
                    vec![SqlValue::I64(1), SqlValue::from("dup")],
                    vec![SqlValue::I64(2), SqlValue::Null],
                    vec![SqlValue::I64(3), SqlValue::from("c")],
                ],
            )
            .unwrap();
        assert_eq!(outcome.written, 2);
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.failures.iter().all(|e| !e.is_fatal()));
        w.finish().unwrap();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM \"T\"", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_existing_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.sqlite3");
        std::fs::write(&path, b"not a database").unwrap();

        let mut w = SqliteWriter::create(&path, 10).unwrap();
        w.execute("CREATE TABLE x (a INTEGER)").unwrap();
        w.finish().unwrap();

        let conn = Connection::open(&path).unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE name = 'x'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_drop_without_finish_rolls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.sqlite3");
        {
            let mut w = SqliteWriter::create(&path, 10).unwrap();
            w.execute("CREATE TABLE x (a INTEGER)").unwrap();
        }
        let conn = Connection::open(&path).unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_bad_statement_is_recoverable() {
        let conn = Connection::open_in_memory().unwrap();
        let mut w = SqliteWriter::from_connection(conn, Path::new(":memory:"), 10).unwrap();
        let err = w.execute("CREATE TABLE (").unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, ConvertError::TargetWrite { ref statement, .. } if statement == "CREATE TABLE ("));
    }

    #[test]
    fn test_value_binding() {
        let conn = Connection::open_in_memory().unwrap();
        let mut w = SqliteWriter::from_connection(conn, Path::new(":memory:"), 10).unwrap();
        w.execute("CREATE TABLE v (a, b, c, d)").unwrap();
        let plan = InsertPlan::new(
            &SqliteDialect::new(),
            "v",
            &["a".into(), "b".into(), "c".into(), "d".into()],
        );
        w.write_batch(
            &plan,
            &[vec![
                SqlValue::Bool(true),
                SqlValue::Decimal(rust_decimal::Decimal::new(12345, 2)),
                SqlValue::Bytes(std::borrow::Cow::Owned(vec![1, 2])),
                SqlValue::Bytes(std::borrow::Cow::Owned(vec![])),
            ]],
        )
        .unwrap();

        let (a, b, c, d): (i64, String, Vec<u8>, Option<Vec<u8>>) = w
            .connection()
            .query_row("SELECT a, b, c, d FROM v", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
            })
            .unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, "123.45");
        assert_eq!(c, vec![1, 2]);
        assert!(d.is_none());
    }
}
