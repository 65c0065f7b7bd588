//! # access-convert
//!
//! Converts a desktop-database catalog into a MySQL SQL dump, a SQLite
//! database file or a JSON export of its data.
//!
//! The library provides:
//!
//! - **Type mapping** from source column categories to each target dialect
//! - **Blob extraction** of attachments and embedded objects, as JSON
//!   references, inline base64 or files on disk
//! - **Constraint translation** of indexes and relationships, including
//!   cascade actions
//! - **Auto-increment correction** from the highest value actually copied
//! - **Streaming emission** in bounded batches through one engine shared by
//!   every target
//!
//! ## Example
//!
//! ```rust,no_run
//! use access_convert::{Config, Orchestrator};
//!
//! fn main() -> access_convert::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let result = Orchestrator::new(config).run();
//!     println!("Wrote {} rows to {}", result.rows_written, result.output_file);
//!     Ok(())
//! }
//! ```

pub mod blob;
pub mod config;
pub mod constraints;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod sequence;
pub mod source;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use blob::{BlobExtractor, BlobRecord, WriteOutcome};
pub use config::{
    Config, ConversionConfig, FilesMode, JsonRowShape, SourceConfig, TargetConfig, TargetKind,
};
pub use constraints::ConstraintTranslator;
pub use crate::core::{CellValue, Column, Dialect, OutputSink, Relationship, SourceCatalog, SqlValue, Table};
pub use drivers::{
    DialectImpl, JsonDialect, JsonWriter, MysqlDialect, MysqlDumpWriter, SqliteDialect, SqliteWriter,
};
pub use error::{ConvertError, Diagnostic, DiagnosticKind, Result};
pub use orchestrator::{CatalogSummary, ConversionResult, Orchestrator, RunStatus};
pub use sequence::AutoIncrementReconciler;
pub use source::SnapshotCatalog;
pub use transfer::{ConversionContext, DataEmitter, Progress};
