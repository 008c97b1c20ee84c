//! Saving and loading transform configurations as JSON

use std::fs;
use std::path::Path;

use crate::error::{LastrxError, Result};
use crate::models::TransformConfig;

/// Serialize a configuration to pretty-printed JSON with a trailing newline
pub fn transform_config_to_json(config: &TransformConfig) -> Result<String> {
    let mut json = serde_json::to_string_pretty(config)
        .map_err(|e| LastrxError::Serialization(e.to_string()))?;
    json.push('\n');
    Ok(json)
}

/// Parse a configuration from JSON
pub fn transform_config_from_json(json: &str) -> Result<TransformConfig> {
    serde_json::from_str(json).map_err(|e| LastrxError::Serialization(e.to_string()))
}

/// Write a configuration to disk
pub fn save_transform_config(config: &TransformConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = transform_config_to_json(config)?;
    fs::write(path, json)?;
    tracing::debug!("Saved transform configuration to {}", path.display());
    Ok(())
}

/// Read a configuration from disk
pub fn load_transform_config(path: impl AsRef<Path>) -> Result<TransformConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| LastrxError::ConfigFileUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| LastrxError::ConfigFileInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
