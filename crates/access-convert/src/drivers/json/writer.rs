//! JSON export writer.
//!
//! Streams one array of table objects into a temporary file in the
//! destination directory, moved into place by `finish` like the dump writer.
//! Attachment and embedded-object cells hold sidecar JSON, which is embedded
//! as structured data rather than as a string.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::JsonRowShape;
use crate::core::{BatchOutcome, InsertPlan, OutputSink, SqlValue, Table};
use crate::error::{ConvertError, Result};

use super::dialect::json_value;

/// Column metadata written with `json_columns`.
#[derive(Debug, Serialize)]
struct ColumnMeta<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: Value,
    size: u16,
}

/// The table whose `data` array is open.
#[derive(Debug)]
struct OpenTable {
    name: String,
    /// Per column, whether the cell text is sidecar JSON.
    embedded: Vec<bool>,
    rows: u64,
}

/// JSON export writer.
pub struct JsonWriter {
    out: BufWriter<NamedTempFile>,
    path: PathBuf,
    shape: JsonRowShape,
    with_columns: bool,
    batch_rows: usize,
    tables: usize,
    open: Option<OpenTable>,
}

impl JsonWriter {
    /// Create the temporary export file beside `path` and open the array.
    pub fn create(path: &Path, shape: JsonRowShape, with_columns: bool, batch_rows: usize) -> Result<Self> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = NamedTempFile::new_in(&dir).map_err(|e| {
            ConvertError::output_sink(e, format!("creating temporary export in {}", dir.display()))
        })?;

        let mut writer = Self {
            out: BufWriter::new(tmp),
            path: path.to_path_buf(),
            shape,
            with_columns,
            batch_rows: batch_rows.max(1),
            tables: 0,
            open: None,
        };
        writer.write_raw("[")?;
        Ok(writer)
    }

    fn write_raw(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| ConvertError::output_sink(e, format!("writing {}", self.path.display())))
    }

    fn close_table(&mut self) -> Result<()> {
        if let Some(table) = self.open.take() {
            debug!("{}: exported {} rows", table.name, table.rows);
            let close = if table.rows == 0 { "]}" } else { "\n]}" };
            self.write_raw(close)?;
        }
        Ok(())
    }

    fn cell(embedded: bool, value: &SqlValue<'_>) -> Value {
        match value {
            SqlValue::Text(s) if embedded => {
                serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
            }
            other => json_value(other),
        }
    }

    fn row_text(&self, plan: &InsertPlan, embedded: &[bool], row: &[SqlValue<'_>]) -> Result<String> {
        let cells = row
            .iter()
            .enumerate()
            .map(|(idx, v)| Self::cell(embedded.get(idx).copied().unwrap_or(false), v));

        let text = match self.shape {
            JsonRowShape::Array => Value::Array(cells.collect()).to_string(),
            // Written by hand so keys keep column order.
            JsonRowShape::Assoc => {
                let mut members = Vec::with_capacity(row.len());
                for (name, cell) in plan.columns.iter().zip(cells) {
                    members.push(format!("{}:{}", serde_json::to_string(name)?, cell));
                }
                format!("{{{}}}", members.join(","))
            }
        };
        Ok(text)
    }
}

impl OutputSink for JsonWriter {
    fn batch_rows(&self) -> usize {
        self.batch_rows
    }

    fn comment(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn begin_table(&mut self, table: &Table) -> Result<()> {
        self.close_table()?;

        let mut header = String::from(if self.tables == 0 { "\n{" } else { ",\n{" });
        header.push_str(&format!("\"name\":{}", serde_json::to_string(&table.name)?));
        if self.with_columns {
            let columns = table
                .columns
                .iter()
                .map(|c| -> Result<ColumnMeta<'_>> {
                    Ok(ColumnMeta {
                        name: &c.name,
                        kind: serde_json::to_value(c.source_type)?,
                        size: c.length,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            header.push_str(&format!(",\"columns\":{}", serde_json::to_string(&columns)?));
        }
        header.push_str(",\"data\":[");
        self.write_raw(&header)?;

        self.tables += 1;
        self.open = Some(OpenTable {
            name: table.name.clone(),
            embedded: table.columns.iter().map(|c| c.source_type.is_blob_container()).collect(),
            rows: 0,
        });
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        debug!("Skipping for JSON: {}", sql);
        Ok(())
    }

    fn write_batch(&mut self, plan: &InsertPlan, rows: &[Vec<SqlValue<'_>>]) -> Result<BatchOutcome> {
        let Some(mut table) = self.open.take().filter(|t| t.name == plan.table) else {
            return Err(ConvertError::output_sink(
                "rows arrived before their table was opened",
                format!("exporting {}", plan.table),
            ));
        };

        let mut text = String::new();
        for row in rows {
            text.push_str(if table.rows == 0 { "\n" } else { ",\n" });
            text.push_str(&self.row_text(plan, &table.embedded, row)?);
            table.rows += 1;
        }
        self.open = Some(table);
        self.write_raw(&text)?;

        Ok(BatchOutcome {
            written: rows.len() as u64,
            failures: Vec::new(),
        })
    }

    fn finish(mut self) -> Result<()> {
        self.close_table()?;
        self.write_raw("\n]\n")?;

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

        info!("Wrote {} tables to {}", self.tables, self.path.display());
        Ok(())
    }
}
