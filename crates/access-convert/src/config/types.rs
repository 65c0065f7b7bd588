//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default rows per INSERT statement in a text dump.
pub const DEFAULT_INSERT_BATCH_ROWS: usize = 100;

/// Default rows per submitted batch when executing directly.
pub const DEFAULT_EXEC_BATCH_SIZE: usize = 500;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source catalog configuration.
    pub source: SourceConfig,

    /// Target configuration.
    #[serde(default)]
    pub target: TargetConfig,

    /// Conversion behavior configuration.
    #[serde(default)]
    pub conversion: ConversionConfig,
}

/// Source catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the catalog snapshot file.
    pub path: PathBuf,
}

impl SourceConfig {
    /// File stem of the source, used to name derived outputs.
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "database".to_string())
    }

    /// Directory containing the source file.
    pub fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Target kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// SQL text dump for MySQL.
    #[default]
    MysqlDump,
    /// SQLite database file written through a live connection.
    Sqlite,
    /// JSON export of every table's rows.
    Json,
}

impl TargetKind {
    /// Extension used for the default output file name.
    pub fn default_extension(self) -> &'static str {
        match self {
            TargetKind::MysqlDump => "sql",
            TargetKind::Sqlite => "sqlite3",
            // Snapshot sources are JSON too
            TargetKind::Json => "export.json",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::MysqlDump => "mysql_dump",
            TargetKind::Sqlite => "sqlite",
            TargetKind::Json => "json",
        }
    }
}

impl std::str::FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "mysql_dump" | "mysql" => Ok(TargetKind::MysqlDump),
            "sqlite" | "sqlite3" => Ok(TargetKind::Sqlite),
            "json" => Ok(TargetKind::Json),
            other => Err(format!(
                "unknown target type '{}' (expected mysql_dump, sqlite or json)",
                other
            )),
        }
    }
}

/// Target configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target kind (default: mysql_dump).
    #[serde(default)]
    pub r#type: TargetKind,

    /// Output path. Defaults to `<source-stem>.<ext>` next to the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Character set for MySQL dumps (default: "utf8mb4").
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Collation for MySQL dumps (default: "utf8mb4_unicode_ci").
    #[serde(default = "default_collation")]
    pub collation: String,

    /// Storage engine for MySQL dumps (default: "InnoDB").
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Row shape for JSON exports (default: assoc).
    #[serde(default)]
    pub json_rows: JsonRowShape,

    /// Include column metadata in JSON exports (default: false).
    #[serde(default)]
    pub json_columns: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            r#type: TargetKind::default(),
            output: None,
            charset: default_charset(),
            collation: default_collation(),
            engine: default_engine(),
            json_rows: JsonRowShape::default(),
            json_columns: false,
        }
    }
}

impl TargetConfig {
    /// Resolve the output path for a given source.
    pub fn output_path(&self, source: &SourceConfig) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => source.directory().join(format!(
                "{}.{}",
                source.base_name(),
                self.r#type.default_extension()
            )),
        }
    }
}

/// How a JSON export writes each row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JsonRowShape {
    /// An object keyed by column name.
    #[default]
    Assoc,
    /// An array of values in column order.
    Array,
}

impl std::str::FromStr for JsonRowShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assoc" | "object" => Ok(JsonRowShape::Assoc),
            "array" => Ok(JsonRowShape::Array),
            other => Err(format!(
                "unknown JSON row shape '{}' (expected assoc or array)",
                other
            )),
        }
    }
}

/// How blob payloads (attachments, embedded objects) are stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilesMode {
    /// Record name, type and size only.
    #[default]
    Reference,
    /// Embed base64-encoded bytes in the sidecar JSON.
    Inline,
    /// Write files next to the source and record relative paths.
    File,
    /// Write files next to the source and record absolute paths.
    FileAbsolute,
}

impl FilesMode {
    pub fn writes_files(self) -> bool {
        matches!(self, FilesMode::File | FilesMode::FileAbsolute)
    }
}

impl std::str::FromStr for FilesMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "reference" => Ok(FilesMode::Reference),
            "inline" => Ok(FilesMode::Inline),
            "file" => Ok(FilesMode::File),
            "file_absolute" => Ok(FilesMode::FileAbsolute),
            other => Err(format!(
                "unknown files mode '{}' (expected reference, inline, file or file_absolute)",
                other
            )),
        }
    }
}

/// Conversion behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Rows per INSERT statement for text dumps (default: 100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_batch_rows: Option<usize>,

    /// Rows per submitted batch for direct execution (default: 500).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_batch_size: Option<usize>,

    /// Emit DROP TABLE IF EXISTS before each CREATE (default: false).
    #[serde(default)]
    pub drop_tables: bool,

    /// Blob storage mode (default: reference).
    #[serde(default)]
    pub files_mode: FilesMode,

    /// Replace externalized files that already exist (default: false).
    #[serde(default)]
    pub overwrite_existing_files: bool,

    /// Create indexes after each table's data (default: true).
    #[serde(default = "default_true")]
    pub create_indexes: bool,

    /// Create foreign keys after all tables (default: true).
    #[serde(default = "default_true")]
    pub create_foreign_keys: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            insert_batch_rows: None,
            exec_batch_size: None,
            drop_tables: false,
            files_mode: FilesMode::default(),
            overwrite_existing_files: false,
            create_indexes: true,
            create_foreign_keys: true,
        }
    }
}

impl ConversionConfig {
    pub fn get_insert_batch_rows(&self) -> usize {
        self.insert_batch_rows.unwrap_or(DEFAULT_INSERT_BATCH_ROWS)
    }

    pub fn get_exec_batch_size(&self) -> usize {
        self.exec_batch_size.unwrap_or(DEFAULT_EXEC_BATCH_SIZE)
    }
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_collation() -> String {
    "utf8mb4_unicode_ci".to_string()
}

fn default_engine() -> String {
    "InnoDB".to_string()
}

fn default_true() -> bool {
    true
}

/// Whether two paths refer to the same location as written.
pub(crate) fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
