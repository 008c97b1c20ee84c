use crate::error::{LastrxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Points per chunk streamed through the transformer
pub const DEFAULT_CHUNK_SIZE: u64 = 10_000;

/// Progress polling interval of the orchestrator
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Extension appended to output paths that have none
pub const DEFAULT_EXTENSION: &str = "laz";

/// Name of the settings file looked up in the working directory
pub const SETTINGS_FILE_NAME: &str = "lastrx.toml";

/// Number of CPUs available to this process, at least 1
pub fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from settings file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered run settings for a batch conversion
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub max_workers: ConfigValue<usize>,
    pub chunk_size: ConfigValue<u64>,
    pub poll_interval_ms: ConfigValue<u64>,
    pub default_extension: ConfigValue<String>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            max_workers: ConfigValue::new(available_cpus(), ConfigSource::Default),
            chunk_size: ConfigValue::new(DEFAULT_CHUNK_SIZE, ConfigSource::Default),
            poll_interval_ms: ConfigValue::new(DEFAULT_POLL_INTERVAL_MS, ConfigSource::Default),
            default_extension: ConfigValue::new(
                DEFAULT_EXTENSION.to_string(),
                ConfigSource::Default,
            ),
        }
    }

    /// Load settings from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| LastrxError::ConfigFileUnreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| LastrxError::ConfigFileInvalid {
                path: path.to_path_buf(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(max_workers) = file_config.max_workers {
            self.max_workers.update(parse_max_workers(max_workers)?, ConfigSource::File);
        }

        if let Some(chunk_size) = file_config.chunk_size {
            self.chunk_size.update(parse_chunk_size(chunk_size)?, ConfigSource::File);
        }

        if let Some(poll_interval_ms) = file_config.poll_interval_ms {
            self.poll_interval_ms
                .update(parse_poll_interval(poll_interval_ms)?, ConfigSource::File);
        }

        if let Some(extension) = file_config.default_extension {
            self.default_extension
                .update(parse_extension(&extension)?, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load the settings file from the working directory if one exists
    pub fn load_from_working_dir(self) -> Result<Self> {
        let path = Path::new(SETTINGS_FILE_NAME);
        if path.is_file() {
            self.load_from_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load settings from environment variables
    pub fn load_from_env(mut self) -> Self {
        // LASTRX_MAX_WORKERS
        if let Ok(raw) = env::var("LASTRX_MAX_WORKERS") {
            match raw.trim().parse::<i64>().map_err(|e| e.to_string()).and_then(|n| {
                parse_max_workers(n).map_err(|e| e.to_string())
            }) {
                Ok(n) => self.max_workers.update(n, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid LASTRX_MAX_WORKERS value '{}': expected a positive integer",
                    raw
                ),
            }
        }

        // LASTRX_CHUNK_SIZE
        if let Ok(raw) = env::var("LASTRX_CHUNK_SIZE") {
            match raw.trim().parse::<i64>().map_err(|e| e.to_string()).and_then(|n| {
                parse_chunk_size(n).map_err(|e| e.to_string())
            }) {
                Ok(n) => self.chunk_size.update(n, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid LASTRX_CHUNK_SIZE value '{}': expected a positive integer",
                    raw
                ),
            }
        }

        // LASTRX_POLL_INTERVAL_MS
        if let Ok(raw) = env::var("LASTRX_POLL_INTERVAL_MS") {
            match raw.trim().parse::<i64>().map_err(|e| e.to_string()).and_then(|n| {
                parse_poll_interval(n).map_err(|e| e.to_string())
            }) {
                Ok(n) => self.poll_interval_ms.update(n, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid LASTRX_POLL_INTERVAL_MS value '{}': expected a positive integer",
                    raw
                ),
            }
        }

        // LASTRX_DEFAULT_EXTENSION
        if let Ok(raw) = env::var("LASTRX_DEFAULT_EXTENSION") {
            match parse_extension(&raw) {
                Ok(ext) => self.default_extension.update(ext, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid LASTRX_DEFAULT_EXTENSION value '{}': expected a file extension such as laz or las",
                    raw
                ),
            }
        }

        self
    }

    /// Update settings from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) -> Result<()> {
        if let Some(max_workers) = overrides.max_workers {
            self.max_workers.update(parse_max_workers(max_workers)?, ConfigSource::Cli);
        }

        if let Some(chunk_size) = overrides.chunk_size {
            self.chunk_size.update(parse_chunk_size(chunk_size)?, ConfigSource::Cli);
        }

        if let Some(poll_interval_ms) = overrides.poll_interval_ms {
            self.poll_interval_ms
                .update(parse_poll_interval(poll_interval_ms)?, ConfigSource::Cli);
        }

        if let Some(extension) = overrides.default_extension {
            self.default_extension.update(parse_extension(&extension)?, ConfigSource::Cli);
        }

        Ok(())
    }

    /// Worker count clamped to the available CPUs
    pub fn effective_max_workers(&self) -> usize {
        clamp_workers(self.max_workers.value)
    }

    /// Get all settings as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "max_workers".to_string(),
            (self.max_workers.value.to_string(), self.max_workers.source),
        );

        map.insert(
            "chunk_size".to_string(),
            (self.chunk_size.value.to_string(), self.chunk_size.source),
        );

        map.insert(
            "poll_interval_ms".to_string(),
            (self.poll_interval_ms.value.to_string(), self.poll_interval_ms.source),
        );

        map.insert(
            "default_extension".to_string(),
            (self.default_extension.value.clone(), self.default_extension.source),
        );

        map
    }
}

/// Settings loaded from TOML file
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_extension: Option<String>,
}

impl From<&LayeredConfig> for FileConfig {
    fn from(config: &LayeredConfig) -> Self {
        Self {
            max_workers: Some(config.max_workers.value as i64),
            chunk_size: Some(config.chunk_size.value as i64),
            poll_interval_ms: Some(config.poll_interval_ms.value as i64),
            default_extension: Some(config.default_extension.value.clone()),
        }
    }
}

/// CLI settings overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub max_workers: Option<i64>,
    pub chunk_size: Option<i64>,
    pub poll_interval_ms: Option<i64>,
    pub default_extension: Option<String>,
}

/// Clamp a worker count to the available CPUs, warning when it is reduced
pub fn clamp_workers(requested: usize) -> usize {
    let cpus = available_cpus();
    if requested > cpus {
        tracing::warn!(
            "Requested {} workers but only {} CPUs are available, using {}",
            requested,
            cpus,
            cpus
        );
        cpus
    } else {
        requested.max(1)
    }
}

/// Validate a worker count
pub fn parse_max_workers(n: i64) -> Result<usize> {
    if n < 1 {
        return Err(LastrxError::ConfigInvalid {
            key: "max_workers".to_string(),
            reason: format!("must be at least 1, got {}", n),
        });
    }
    Ok(n as usize)
}

/// Validate a chunk size
pub fn parse_chunk_size(n: i64) -> Result<u64> {
    if n < 1 {
        return Err(LastrxError::ConfigInvalid {
            key: "chunk_size".to_string(),
            reason: format!("must be at least 1 point, got {}", n),
        });
    }
    Ok(n as u64)
}

/// Validate a polling interval
pub fn parse_poll_interval(n: i64) -> Result<u64> {
    if n < 1 {
        return Err(LastrxError::ConfigInvalid {
            key: "poll_interval_ms".to_string(),
            reason: format!("must be at least 1 ms, got {}", n),
        });
    }
    Ok(n as u64)
}

/// Normalise a file extension, dropping a leading dot
pub fn parse_extension(s: &str) -> Result<String> {
    let ext = s.trim().trim_start_matches('.');
    if ext.is_empty() || ext.contains(['/', '\\', '.']) {
        return Err(LastrxError::ConfigInvalid {
            key: "default_extension".to_string(),
            reason: format!("'{}' is not a file extension", s),
        });
    }
    Ok(ext.to_lowercase())
}
