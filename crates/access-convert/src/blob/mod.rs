//! Blob extraction for attachment and embedded-object cells.
//!
//! Each cell becomes a list of [`BlobRecord`]s that is serialized to JSON and
//! stored as the cell's value. Depending on [`FilesMode`] the bytes are
//! written beside the source, embedded as base64, or only described.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{Config, FilesMode};
use crate::core::{Attachment, OleContent};
use crate::error::{Diagnostic, DiagnosticKind, Result};

/// Directory under the per-column folder an item is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobScope {
    Attachments,
    Ole,
}

impl BlobScope {
    pub fn as_str(self) -> &'static str {
        match self {
            BlobScope::Attachments => "attachments",
            BlobScope::Ole => "ole",
        }
    }
}

/// Result of writing one externalized file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    SkippedExisting,
    Failed(String),
}

/// One entry of a cell's sidecar JSON array.
///
/// Exactly one of `path`, `data`, `error` or `warning` is set, except for
/// reference records which carry none of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobRecord {
    pub name: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(rename = "isRelativePath", skip_serializing_if = "Option::is_none")]
    pub is_relative_path: Option<bool>,

    /// Base64-encoded payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl BlobRecord {
    fn base(name: &str, file_type: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            file_type: file_type.map(str::to_string),
            size: None,
            path: None,
            is_relative_path: None,
            data: None,
            error: None,
            warning: None,
        }
    }

    pub fn reference(name: &str, file_type: Option<&str>, size: u64) -> Self {
        Self {
            size: Some(size),
            ..Self::base(name, file_type)
        }
    }

    pub fn inline(name: &str, file_type: Option<&str>, data: &[u8]) -> Self {
        Self {
            size: Some(data.len() as u64),
            data: Some(STANDARD.encode(data)),
            ..Self::base(name, file_type)
        }
    }

    pub fn external(name: &str, file_type: Option<&str>, size: u64, path: String, relative: bool) -> Self {
        Self {
            size: Some(size),
            path: Some(path),
            is_relative_path: Some(relative),
            ..Self::base(name, file_type)
        }
    }

    pub fn with_warning(name: &str, file_type: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            warning: Some(message.into()),
            ..Self::base(name, file_type)
        }
    }

    pub fn with_error(name: &str, file_type: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::base(name, file_type)
        }
    }
}

/// Records and diagnostics produced for one cell.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<BlobRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    /// Sidecar JSON for the cell, or `None` when the cell should be NULL.
    pub fn to_json(&self) -> Result<Option<String>> {
        if self.records.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_string(&self.records)?))
    }
}

/// Replace characters that would let a name escape its directory.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.trim() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Split a file name into base name and extension.
fn split_file_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Turns attachment and embedded-object cells into sidecar records.
#[derive(Debug, Clone)]
pub struct BlobExtractor {
    mode: FilesMode,
    overwrite: bool,
    /// Directory the `<base>-files` tree is created in.
    root: PathBuf,
    base_name: String,
}

impl BlobExtractor {
    pub fn new(mode: FilesMode, overwrite: bool, root: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            mode,
            overwrite,
            root: root.into(),
            base_name: base_name.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.conversion.files_mode,
            config.conversion.overwrite_existing_files,
            config.source.directory(),
            config.source.base_name(),
        )
    }

    /// Directory externalized files are written under, when the mode
    /// writes files at all.
    pub fn files_dir(&self) -> Option<PathBuf> {
        self.mode
            .writes_files()
            .then(|| self.root.join(self.files_dir_name()))
    }

    fn files_dir_name(&self) -> String {
        format!("{}-files", sanitize_component(&self.base_name))
    }

    /// Path of an externalized item relative to the source directory.
    pub fn relative_path(
        &self,
        scope: BlobScope,
        table: &str,
        column: &str,
        row_seq: u64,
        file_name: &str,
    ) -> PathBuf {
        self.item_path(scope, table, column, row_seq, None, file_name)
    }

    /// Like [`Self::relative_path`], with the 1-based position of the item
    /// in its cell appended for names that repeat within the cell.
    fn item_path(
        &self,
        scope: BlobScope,
        table: &str,
        column: &str,
        row_seq: u64,
        item: Option<usize>,
        file_name: &str,
    ) -> PathBuf {
        let file_name = sanitize_component(file_name);
        let (stem, ext) = split_file_name(&file_name);
        let tag = match item {
            Some(item) => format!("{}-[{}]-{}", stem, row_seq, item),
            None => format!("{}-[{}]", stem, row_seq),
        };
        let leaf = match ext {
            Some(ext) => format!("{}.{}", tag, ext),
            None => tag,
        };

        PathBuf::from(self.files_dir_name())
            .join(sanitize_component(table))
            .join(sanitize_component(column))
            .join(scope.as_str())
            .join(leaf)
    }

    /// Build records for a multi-value attachment cell.
    pub fn extract_attachments(
        &self,
        table: &str,
        column: &str,
        row_seq: u64,
        items: &[Attachment],
    ) -> Extraction {
        let mut out = Extraction::default();
        // Case-folded, since the files may land on a case-insensitive volume.
        let mut seen = HashSet::new();
        for (idx, item) in items.iter().enumerate() {
            let repeated = !seen.insert(sanitize_component(&item.name).to_lowercase());
            self.extract_item(
                &mut out,
                BlobScope::Attachments,
                table,
                column,
                row_seq,
                repeated.then_some(idx + 1),
                &item.name,
                item.file_type.as_deref(),
                &item.data,
            );
        }
        out
    }

    /// Build records for an embedded-object cell.
    ///
    /// Only packaged files can be extracted. Any other content yields no
    /// records and a value-read diagnostic.
    pub fn extract_ole(&self, table: &str, column: &str, row_seq: u64, content: &OleContent) -> Extraction {
        let mut out = Extraction::default();
        match content {
            OleContent::SimplePackage { file_name, data } => {
                self.extract_item(&mut out, BlobScope::Ole, table, column, row_seq, None, file_name, None, data);
            }
            OleContent::Unsupported { kind } => {
                let message = format!("unsupported embedded object type '{}' in row {}", kind, row_seq);
                warn!("{}.{}: {}", table, column, message);
                out.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::ValueRead, message)
                        .with_table(table)
                        .with_column(column),
                );
            }
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn extract_item(
        &self,
        out: &mut Extraction,
        scope: BlobScope,
        table: &str,
        column: &str,
        row_seq: u64,
        item: Option<usize>,
        name: &str,
        file_type: Option<&str>,
        data: &[u8],
    ) {
        let record = match self.mode {
            FilesMode::Reference => BlobRecord::reference(name, file_type, data.len() as u64),
            FilesMode::Inline => BlobRecord::inline(name, file_type, data),
            FilesMode::File | FilesMode::FileAbsolute => {
                let relative = self.item_path(scope, table, column, row_seq, item, name);
                let absolute = self.root.join(&relative);

                match self.write_file(&absolute, data) {
                    WriteOutcome::Written => {
                        let recorded = if self.mode == FilesMode::FileAbsolute {
                            absolute_display(&absolute)
                        } else {
                            relative_display(&relative)
                        };
                        BlobRecord::external(
                            name,
                            file_type,
                            data.len() as u64,
                            recorded,
                            self.mode == FilesMode::File,
                        )
                    }
                    WriteOutcome::SkippedExisting => {
                        let message = format!("file {} already exists", relative_display(&relative));
                        out.diagnostics.push(
                            Diagnostic::new(DiagnosticKind::BlobConflict, message.clone())
                                .with_table(table)
                                .with_column(column),
                        );
                        BlobRecord::with_warning(name, file_type, message)
                    }
                    WriteOutcome::Failed(reason) => {
                        warn!("{}.{}: cannot write {}: {}", table, column, absolute.display(), reason);
                        out.diagnostics.push(
                            Diagnostic::new(DiagnosticKind::BlobIo, reason.clone())
                                .with_table(table)
                                .with_column(column),
                        );
                        BlobRecord::with_error(name, file_type, reason)
                    }
                }
            }
        };
        out.records.push(record);
    }

    /// Write bytes to `path` unless it exists and overwriting is off.
    pub fn write_file(&self, path: &Path, data: &[u8]) -> WriteOutcome {
        if path.exists() && !self.overwrite {
            debug!("Keeping existing file {}", path.display());
            return WriteOutcome::SkippedExisting;
        }

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return WriteOutcome::Failed(e.to_string());
            }
        }

        match fs::write(path, data) {
            Ok(()) => WriteOutcome::Written,
            Err(e) => WriteOutcome::Failed(e.to_string()),
        }
    }
}

fn relative_display(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn absolute_display(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute.to_string_lossy().into_owned()
}
