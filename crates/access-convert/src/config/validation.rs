//! Configuration validation.

use super::types::same_path;
use super::{Config, TargetKind};
use crate::error::{ConvertError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.path.as_os_str().is_empty() {
        return Err(ConvertError::Config("source.path is required".into()));
    }

    // Target validation
    let output = config.target.output_path(&config.source);
    if same_path(&output, &config.source.path) {
        return Err(ConvertError::Config(
            "target.output cannot be the same file as source.path".into(),
        ));
    }

    if config.target.r#type == TargetKind::MysqlDump {
        if config.target.charset.trim().is_empty() {
            return Err(ConvertError::Config("target.charset cannot be empty".into()));
        }
        if config.target.collation.trim().is_empty() {
            return Err(ConvertError::Config(
                "target.collation cannot be empty".into(),
            ));
        }
        if config.target.engine.trim().is_empty() {
            return Err(ConvertError::Config("target.engine cannot be empty".into()));
        }
    }

    // Conversion config validation - only check if explicitly set
    if let Some(0) = config.conversion.insert_batch_rows {
        return Err(ConvertError::Config(
            "conversion.insert_batch_rows must be at least 1".into(),
        ));
    }
    if let Some(0) = config.conversion.exec_batch_size {
        return Err(ConvertError::Config(
            "conversion.exec_batch_size must be at least 1".into(),
        ));
    }

    Ok(())
}
