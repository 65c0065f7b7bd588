//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Resolved output path for this run.
    pub fn output_path(&self) -> std::path::PathBuf {
        self.target.output_path(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = Config::from_yaml("source:\n  path: /data/Northwind.json\n").unwrap();
        assert_eq!(config.target.r#type, TargetKind::MysqlDump);
        assert_eq!(config.target.charset, "utf8mb4");
        assert_eq!(config.target.collation, "utf8mb4_unicode_ci");
        assert_eq!(config.target.engine, "InnoDB");
        assert_eq!(config.conversion.get_insert_batch_rows(), 100);
        assert_eq!(config.conversion.get_exec_batch_size(), 500);
        assert_eq!(config.conversion.files_mode, FilesMode::Reference);
        assert!(!config.conversion.overwrite_existing_files);
        assert!(!config.conversion.drop_tables);
        assert!(config.conversion.create_indexes);
        assert!(config.conversion.create_foreign_keys);
        assert_eq!(config.output_path(), PathBuf::from("/data/Northwind.sql"));
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
source:
  path: shop.json
target:
  type: sqlite
  output: out/shop.db
conversion:
  exec_batch_size: 50
  files_mode: file_absolute
  overwrite_existing_files: true
  create_foreign_keys: false
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.target.r#type, TargetKind::Sqlite);
        assert_eq!(config.output_path(), PathBuf::from("out/shop.db"));
        assert_eq!(config.conversion.get_exec_batch_size(), 50);
        assert_eq!(config.conversion.files_mode, FilesMode::FileAbsolute);
        assert!(config.conversion.files_mode.writes_files());
        assert!(config.conversion.overwrite_existing_files);
        assert!(!config.conversion.create_foreign_keys);
    }

    #[test]
    fn test_default_sqlite_output_is_beside_source() {
        let config =
            Config::from_yaml("source:\n  path: shop.json\ntarget:\n  type: sqlite\n").unwrap();
        assert_eq!(config.output_path(), PathBuf::from("./shop.sqlite3"));
    }

    #[test]
    fn test_json_target_options() {
        let yaml = "source:\n  path: shop.json\ntarget:\n  type: json\n  json_rows: array\n  json_columns: true\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.target.r#type, TargetKind::Json);
        assert_eq!(config.target.json_rows, JsonRowShape::Array);
        assert!(config.target.json_columns);
        assert_eq!(config.output_path(), PathBuf::from("./shop.export.json"));
    }

    #[test]
    fn test_unknown_target_type_rejected() {
        let result = Config::from_yaml("source:\n  path: a.json\ntarget:\n  type: oracle\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_enums_from_cli_strings() {
        assert_eq!("mysql".parse::<TargetKind>().unwrap(), TargetKind::MysqlDump);
        assert_eq!("mysql-dump".parse::<TargetKind>().unwrap(), TargetKind::MysqlDump);
        assert_eq!("sqlite".parse::<TargetKind>().unwrap(), TargetKind::Sqlite);
        assert_eq!("json".parse::<TargetKind>().unwrap(), TargetKind::Json);
        assert!("postgres".parse::<TargetKind>().is_err());
        assert_eq!("array".parse::<JsonRowShape>().unwrap(), JsonRowShape::Array);
        assert!("table".parse::<JsonRowShape>().is_err());
        assert_eq!("file-absolute".parse::<FilesMode>().unwrap(), FilesMode::FileAbsolute);
        assert_eq!("inline".parse::<FilesMode>().unwrap(), FilesMode::Inline);
        assert!("zip".parse::<FilesMode>().is_err());
    }
}
