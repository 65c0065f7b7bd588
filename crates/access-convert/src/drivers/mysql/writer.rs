//! MySQL dump writer.
//!
//! Implements `OutputSink` by writing statements to a temporary file in the
//! destination directory. The file is moved into place by `finish`; a writer
//! dropped before that leaves nothing behind.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::core::{BatchOutcome, Dialect, InsertPlan, OutputSink, SqlValue};
use crate::error::{ConvertError, Result};

use super::MysqlDialect;

/// Text dump writer for the MySQL dialect.
pub struct MysqlDumpWriter {
    out: BufWriter<NamedTempFile>,
    path: PathBuf,
    dialect: MysqlDialect,
    batch_rows: usize,
}

impl MysqlDumpWriter {
    /// Create the temporary dump file beside `path` and write the header.
    pub fn create(path: &Path, dialect: MysqlDialect, batch_rows: usize) -> Result<Self> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = NamedTempFile::new_in(&dir).map_err(|e| {
            ConvertError::output_sink(e, format!("creating temporary dump in {}", dir.display()))
        })?;

        let mut writer = Self {
            out: BufWriter::new(tmp),
            path: path.to_path_buf(),
            dialect,
            batch_rows: batch_rows.max(1),
        };
        writer.write_header()?;
        Ok(writer)
    }

    fn write_header(&mut self) -> Result<()> {
        let header = format!(
            "-- {} SQL dump\n-- version {}\n--\n-- Generation time: {}\n\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        self.write_raw(&header)
    }

    fn write_raw(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| ConvertError::output_sink(e, format!("writing {}", self.path.display())))
    }

    fn row_tuple(&self, row: &[SqlValue<'_>]) -> String {
        let values: Vec<String> = row.iter().map(|v| self.dialect.literal(v)).collect();
        format!("({})", values.join(", "))
    }
}

impl OutputSink for MysqlDumpWriter {
    fn batch_rows(&self) -> usize {
        self.batch_rows
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        self.write_raw(&format!("\n--\n-- {}\n--\n\n", text))
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.write_raw(&format!("{};\n", sql))
    }

    fn write_batch(&mut self, plan: &InsertPlan, rows: &[Vec<SqlValue<'_>>]) -> Result<BatchOutcome> {
        if rows.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let tuples: Vec<String> = rows.iter().map(|r| self.row_tuple(r)).collect();
        let statement = format!("{}\n{};\n", plan.header, tuples.join(",\n"));
        self.write_raw(&statement)?;

        debug!("{}: wrote {} rows", plan.table, rows.len());
        Ok(BatchOutcome {
            written: rows.len() as u64,
            failures: Vec::new(),
        })
    }

    fn finish(self) -> Result<()> {
        let context = format!("finalizing {}", self.path.display());
        let tmp = self
            .out
            .into_inner()
            .map_err(|e| ConvertError::output_sink(e.error(), context.clone()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| ConvertError::output_sink(e, context.clone()))?;
        tmp.persist(&self.path)
            .map_err(|e| ConvertError::output_sink(e.error, context))?;

        info!("Wrote dump to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_plan(dialect: &MysqlDialect) -> InsertPlan {
        InsertPlan::new(dialect, "T", &["a".to_string(), "b".to_string()])
    }

    #[test]
    fn test_finish_persists_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.sql");
        let dialect = MysqlDialect::default();
        let plan = make_test_plan(&dialect);

        let mut w = MysqlDumpWriter::create(&path, dialect, 100).unwrap();
        w.comment("Dumping data for table `T`").unwrap();
        let outcome = w
            .write_batch(
                &plan,
                &[
                    vec![SqlValue::I64(1), SqlValue::from("x")],
                    vec![SqlValue::I64(2), SqlValue::Null],
                ],
            )
            .unwrap();
        assert_eq!(outcome.written, 2);
        assert!(!path.exists());
        w.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("-- access-convert SQL dump\n-- version "));
        assert!(text.contains("--\n-- Dumping data for table `T`\n--\n"));
        assert!(text.contains("INSERT INTO `T` (`a`, `b`) VALUES\n(1, 'x'),\n(2, NULL);\n"));
    }

    #[test]
    fn test_drop_without_finish_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.sql");
        {
            let mut w = MysqlDumpWriter::create(&path, MysqlDialect::default(), 100).unwrap();
            w.execute("SET AUTOCOMMIT = 0").unwrap();
        }
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_directory_is_output_error() {
        let err = MysqlDumpWriter::create(Path::new("/nonexistent/dir/out.sql"), MysqlDialect::default(), 100)
            .err()
            .unwrap();
        assert!(matches!(err, ConvertError::OutputSink { .. }));
    }
}
