//! Per-run conversion state.

use tracing::warn;

use crate::config::Config;
use crate::core::OutputSink;
use crate::error::{ConvertError, Diagnostic, Result};

/// Progress counters for one run.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub tables_total: usize,
    pub tables_done: usize,
    pub tables_failed: usize,
    pub rows_read: u64,
    pub rows_written: u64,
    pub failed_tables: Vec<String>,
}

impl Progress {
    pub fn tables_success(&self) -> usize {
        self.tables_done.saturating_sub(self.tables_failed)
    }
}

/// State carried through every step of a run: configuration, the output
/// sink, collected diagnostics and progress.
pub struct ConversionContext<'a, S: OutputSink> {
    pub config: &'a Config,
    pub sink: S,
    pub diagnostics: Vec<Diagnostic>,
    pub progress: Progress,
}

impl<'a, S: OutputSink> ConversionContext<'a, S> {
    pub fn new(config: &'a Config, sink: S) -> Self {
        Self {
            config,
            sink,
            diagnostics: Vec::new(),
            progress: Progress::default(),
        }
    }

    /// Record a recoverable problem.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        warn!(
            "{}{}: {}",
            diagnostic.table.as_deref().unwrap_or("-"),
            diagnostic
                .column
                .as_deref()
                .map(|c| format!(".{}", c))
                .unwrap_or_default(),
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    /// Execute one statement. A rejected statement is recorded and reported
    /// as `Ok(false)`; any other error is returned.
    pub fn execute(&mut self, table: &str, sql: &str) -> Result<bool> {
        match self.sink.execute(sql) {
            Ok(()) => Ok(true),
            Err(e) if !e.is_fatal() => {
                self.record(Diagnostic::from_target_write(table, &e));
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Record every recoverable failure of a batch.
    pub fn record_failures(&mut self, table: &str, failures: &[ConvertError]) {
        for failure in failures {
            self.record(Diagnostic::from_target_write(table, failure));
        }
    }

    /// Split into the sink and the collected results.
    pub fn into_parts(self) -> (S, Vec<Diagnostic>, Progress) {
        (self.sink, self.diagnostics, self.progress)
    }
}
