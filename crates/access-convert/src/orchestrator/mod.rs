//! Conversion orchestrator - coordinates one end-to-end run.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::Config;
use crate::core::{OutputSink, Relationship, SourceCatalog, Table};
use crate::drivers::{DialectImpl, JsonWriter, MysqlDumpWriter, SqliteWriter};
use crate::error::{ConvertError, Diagnostic, Result};
use crate::source::{ordered_tables, SnapshotCatalog};
use crate::transfer::{ConversionContext, DataEmitter, Progress};

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failure,
}

/// The fatal error that ended a failed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub kind: String,
    pub message: String,
    pub exit_code: u8,
}

impl From<&ConvertError> for RunError {
    fn from(e: &ConvertError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.format_detailed(),
            exit_code: e.exit_code(),
        }
    }
}

/// Result of a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: RunStatus,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Target kind.
    pub target: String,

    /// Output file written by a successful run.
    pub output_file: String,

    pub tables_total: usize,
    pub tables_success: usize,
    pub tables_failed: usize,

    /// Rows accepted by the target.
    pub rows_written: u64,

    /// Tables whose CREATE statement was rejected.
    pub failed_tables: Vec<String>,

    /// Non-fatal problems, in the order they were met.
    pub diagnostics: Vec<Diagnostic>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
}

impl ConversionResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Process exit status: 0 on success, else the fatal error's code.
    pub fn exit_code(&self) -> u8 {
        self.error.as_ref().map(|e| e.exit_code).unwrap_or(0)
    }
}

/// Counts reported by `validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub source: String,
    pub tables: usize,
    pub rows: usize,
    pub relationships: usize,
    /// Tables whose rows have no key to be matched by.
    pub tables_without_primary_key: Vec<String>,
    pub output_file: String,
}

/// What a run collected before it ended, successful or not.
#[derive(Default)]
struct RunOutcome {
    diagnostics: Vec<Diagnostic>,
    progress: Progress,
}

/// Conversion orchestrator.
pub struct Orchestrator {
    config: Config,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the conversion. Fatal errors end the run with a failure status;
    /// the output is only put in place on success.
    pub fn run(&self) -> ConversionResult {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let output = self.config.output_path();
        info!("Starting conversion run: {}", run_id);

        let mut outcome = RunOutcome::default();
        let result = self.execute(&output, &mut outcome);

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let (status, error) = match &result {
            Ok(()) => (RunStatus::Success, None),
            Err(e) => {
                error!("Conversion failed: {}", e);
                (RunStatus::Failure, Some(RunError::from(e)))
            }
        };

        let progress = outcome.progress;
        let result = ConversionResult {
            run_id,
            status,
            started_at,
            completed_at,
            duration_seconds: duration,
            target: self.config.target.r#type.as_str().to_string(),
            output_file: output.display().to_string(),
            tables_total: progress.tables_total,
            tables_success: progress.tables_success(),
            tables_failed: progress.tables_failed,
            rows_written: progress.rows_written,
            failed_tables: progress.failed_tables,
            diagnostics: outcome.diagnostics,
            error,
        };

        info!(
            "Conversion {:?}: {} tables, {} rows, {} diagnostics in {:.1}s",
            result.status,
            result.tables_total,
            result.rows_written,
            result.diagnostics.len(),
            result.duration_seconds
        );
        result
    }

    /// Load the catalog and report what a run would convert.
    pub fn validate(&self) -> Result<CatalogSummary> {
        let catalog = SnapshotCatalog::load(&self.config.source.path)?;
        let tables = ordered_tables(&catalog)?;
        let relationships = catalog.relationships()?;

        Ok(CatalogSummary {
            source: self.config.source.path.display().to_string(),
            tables: tables.len(),
            rows: tables.iter().map(|t| t.row_count as usize).sum(),
            relationships: relationships.len(),
            tables_without_primary_key: tables
                .iter()
                .filter(|t| !t.has_pk())
                .map(|t| t.name.clone())
                .collect(),
            output_file: self.config.output_path().display().to_string(),
        })
    }

    fn execute(&self, output: &Path, outcome: &mut RunOutcome) -> Result<()> {
        info!("Phase 1: Reading catalog {}", self.config.source.path.display());
        let catalog = SnapshotCatalog::load(&self.config.source.path)?;
        let tables = ordered_tables(&catalog)?;
        let relationships = catalog.relationships()?;
        info!(
            "Found {} tables and {} relationships",
            tables.len(),
            relationships.len()
        );

        info!(
            "Phase 2: Writing {} output to {}",
            self.config.target.r#type.as_str(),
            output.display()
        );
        let dialect = DialectImpl::from_config(&self.config);
        match &dialect {
            DialectImpl::Mysql(mysql) => {
                let sink = MysqlDumpWriter::create(
                    output,
                    mysql.clone(),
                    self.config.conversion.get_insert_batch_rows(),
                )?;
                self.emit(&catalog, &dialect, tables, &relationships, sink, outcome)
            }
            DialectImpl::Sqlite(_) => {
                let sink = SqliteWriter::create(output, self.config.conversion.get_exec_batch_size())?;
                self.emit(&catalog, &dialect, tables, &relationships, sink, outcome)
            }
            DialectImpl::Json(_) => {
                let sink = JsonWriter::create(
                    output,
                    self.config.target.json_rows,
                    self.config.target.json_columns,
                    self.config.conversion.get_insert_batch_rows(),
                )?;
                self.emit(&catalog, &dialect, tables, &relationships, sink, outcome)
            }
        }
    }

    /// Drive the emitter into `sink`. The sink is finished only when every
    /// table went through; otherwise it is dropped, which discards it.
    fn emit<S: OutputSink>(
        &self,
        catalog: &SnapshotCatalog,
        dialect: &DialectImpl,
        tables: Vec<Table>,
        relationships: &[Relationship],
        sink: S,
        outcome: &mut RunOutcome,
    ) -> Result<()> {
        let mut emitter = DataEmitter::new(dialect, &self.config, tables, relationships);
        let mut ctx = ConversionContext::new(&self.config, sink);
        let result = emitter.run(catalog, &mut ctx);

        let (sink, diagnostics, progress) = ctx.into_parts();
        outcome.diagnostics = diagnostics;
        outcome.progress = progress;

        result?;
        sink.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"{
        "tables": [
            {
                "name": "Orders",
                "columns": [
                    {"name": "OrderId", "type": "integer", "length": 4, "auto_number": true, "required": true},
                    {"name": "CustomerId", "type": "integer", "length": 4},
                    {"name": "Weight", "type": "float", "length": 8}
                ],
                "indexes": [{"name": "PrimaryKey", "columns": ["OrderId"], "unique": true, "primary_key": true}],
                "rows": [[1, 1, 3.14159], [9, 2, "heavy"]]
            },
            {
                "name": "Customers",
                "columns": [
                    {"name": "Id", "type": "integer", "length": 4, "auto_number": true, "required": true},
                    {"name": "Name", "type": "text", "length": 50}
                ],
                "indexes": [{"name": "PrimaryKey", "columns": ["Id"], "unique": true, "primary_key": true}],
                "rows": [[1, "Ann"], [2, "Bob"]]
            }
        ],
        "relationships": [
            {"name": "CustomersOrders", "table": "Orders", "columns": ["CustomerId"],
             "referenced_table": "Customers", "referenced_columns": ["Id"], "cascade_delete": true}
        ]
    }"#;

    fn make_test_config(dir: &TempDir, target: &str) -> Config {
        let source = dir.path().join("shop.json");
        std::fs::write(&source, SNAPSHOT).unwrap();
        Config::from_yaml(&format!(
            "source:\n  path: {}\ntarget:\n  type: {}\n",
            source.display(),
            target
        ))
        .unwrap()
    }

    #[test]
    fn test_mysql_run() {
        let dir = TempDir::new().unwrap();
        let result = Orchestrator::new(make_test_config(&dir, "mysql_dump")).run();

        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.exit_code(), 0);
        assert_eq!(result.tables_total, 2);
        assert_eq!(result.tables_success, 2);
        assert_eq!(result.rows_written, 4);
        assert_eq!(PathBuf::from(&result.output_file), dir.path().join("shop.sql"));

        // "heavy" in a float column
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::ValueRead);

        let dump = std::fs::read_to_string(dir.path().join("shop.sql")).unwrap();
        assert!(dump.contains("(1, 1, 3.14),"));
        assert!(dump.contains("AUTO_INCREMENT=10;"));
        assert!(dump.find("CREATE TABLE IF NOT EXISTS `Customers`") < dump.find("CREATE TABLE IF NOT EXISTS `Orders`"));
        assert!(dump.find("INSERT INTO `Orders`") < dump.find("ON DELETE CASCADE"));
    }

    #[test]
    fn test_sqlite_run() {
        let dir = TempDir::new().unwrap();
        let result = Orchestrator::new(make_test_config(&dir, "sqlite")).run();
        assert!(result.is_success(), "{:?}", result.error);

        let conn = rusqlite::Connection::open(dir.path().join("shop.sqlite3")).unwrap();
        let names: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"Customers\"", [], |r| r.get(0))
            .unwrap();
        assert_eq!(names, 2);
        let heavy: Option<f64> = conn
            .query_row("SELECT \"Weight\" FROM \"Orders\" WHERE \"OrderId\" = 9", [], |r| r.get(0))
            .unwrap();
        assert!(heavy.is_none());
    }

    #[test]
    fn test_json_run() {
        let dir = TempDir::new().unwrap();
        let result = Orchestrator::new(make_test_config(&dir, "json")).run();
        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.target, "json");
        assert_eq!(result.rows_written, 4);
        assert_eq!(PathBuf::from(&result.output_file), dir.path().join("shop.export.json"));

        let text = std::fs::read_to_string(dir.path().join("shop.export.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json[0]["name"], "Customers");
        assert_eq!(json[1]["data"][0], serde_json::json!({"OrderId": 1, "CustomerId": 1, "Weight": 3.14159}));
        assert!(json[1]["data"][1]["Weight"].is_null());
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_yaml(&format!(
            "source:\n  path: {}\n",
            dir.path().join("missing.json").display()
        ))
        .unwrap();

        let result = Orchestrator::new(config).run();
        assert!(!result.is_success());
        assert_eq!(result.exit_code(), 3);
        assert_eq!(result.error.as_ref().unwrap().kind, "schema_read");
        assert!(!dir.path().join("missing.sql").exists());

        let json = result.to_json().unwrap();
        assert!(json.contains("\"status\": \"failure\""));
    }

    #[test]
    fn test_unwritable_output_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = make_test_config(&dir, "mysql_dump");
        config.target.output = Some(dir.path().join("no-such-dir").join("out.sql"));

        let result = Orchestrator::new(config).run();
        assert_eq!(result.exit_code(), 4);
        assert_eq!(result.rows_written, 0);
    }

    #[test]
    fn test_validate_counts() {
        let dir = TempDir::new().unwrap();
        let summary = Orchestrator::new(make_test_config(&dir, "sqlite")).validate().unwrap();
        assert_eq!(summary.tables, 2);
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.relationships, 1);
        assert!(summary.tables_without_primary_key.is_empty());
        assert!(summary.output_file.ends_with("shop.sqlite3"));
    }

    #[test]
    fn test_validate_lists_tables_without_primary_key() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("log.json");
        std::fs::write(
            &source,
            r#"{"tables": [{"name": "Log", "columns": [{"name": "Line", "type": "memo"}], "rows": [["a"]]}]}"#,
        )
        .unwrap();
        let config = Config::from_yaml(&format!("source:\n  path: {}\n", source.display())).unwrap();

        let summary = Orchestrator::new(config).validate().unwrap();
        assert_eq!(summary.tables_without_primary_key, vec!["Log"]);
    }
}
