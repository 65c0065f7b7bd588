//! Error types for the conversion library.
//!
//! Fatal problems are [`ConvertError`] values and abort a run. Recoverable
//! problems are collected as [`Diagnostic`] entries and reported alongside
//! the run result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for conversion operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source catalog could not be enumerated or read.
    #[error("Schema read failed: {0}")]
    SchemaRead(String),

    /// The output file or connection could not be opened, written or finalized.
    #[error("Output sink error: {message}\n  Context: {context}")]
    OutputSink { message: String, context: String },

    /// A single DDL/DML statement was rejected by the target engine.
    #[error("Target write failed: {message}\n  Statement: {statement}")]
    TargetWrite { statement: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    /// Create an OutputSink error with context about where it occurred
    pub fn output_sink(message: impl ToString, context: impl Into<String>) -> Self {
        ConvertError::OutputSink {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a TargetWrite error for a failed statement
    pub fn target_write(statement: impl Into<String>, message: impl ToString) -> Self {
        ConvertError::TargetWrite {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error aborts the run. Only single statement failures are
    /// recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConvertError::TargetWrite { .. })
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::Config(_) => "config",
            ConvertError::SchemaRead(_) => "schema_read",
            ConvertError::OutputSink { .. } => "output_sink",
            ConvertError::TargetWrite { .. } => "target_write",
            ConvertError::Io(_) => "io",
            ConvertError::Yaml(_) => "yaml",
            ConvertError::Json(_) => "json",
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConvertError::Config(_) | ConvertError::Yaml(_) => 1,
            ConvertError::SchemaRead(_) => 3,
            ConvertError::OutputSink { .. } => 4,
            ConvertError::TargetWrite { .. } => 5,
            ConvertError::Json(_) => 6,
            ConvertError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Category of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A cell could not be read; written as NULL.
    ValueRead,
    /// Bytes of a blob cell could not be read or written.
    BlobIo,
    /// An externalized file already existed and was left untouched.
    BlobConflict,
    /// A statement failed against the target engine.
    TargetWrite,
}

impl DiagnosticKind {
    /// Warnings keep the cell value; everything else degrades it.
    pub fn is_warning(self) -> bool {
        matches!(self, DiagnosticKind::BlobConflict)
    }
}

/// A recoverable problem encountered during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    pub message: String,

    /// Offending statement text for target write failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            table: None,
            column: None,
            message: message.into(),
            statement: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    /// Build a diagnostic from a recoverable target write error.
    pub fn from_target_write(table: &str, err: &ConvertError) -> Self {
        match err {
            ConvertError::TargetWrite { statement, message } => {
                Diagnostic::new(DiagnosticKind::TargetWrite, message.clone())
                    .with_table(table)
                    .with_statement(statement.clone())
            }
            other => Diagnostic::new(DiagnosticKind::TargetWrite, other.to_string())
                .with_table(table),
        }
    }
}
