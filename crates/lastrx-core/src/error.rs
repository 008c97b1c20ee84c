//! Error types for LAS-TRX

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LastrxError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    #[error(
        "No implementation for reference frame {ref_frame} with vertical datum {vertical_datum}"
    )]
    UnsupportedCombination {
        ref_frame: String,
        vertical_datum: String,
    },

    #[error("Unsupported UTM zone {zone}: expected a zone between 3 and 23")]
    UtmZoneOutOfRange { zone: i64 },

    #[error("Failed to read configuration file {path}: {reason}")]
    ConfigFileUnreadable { path: PathBuf, reason: String },

    #[error("Invalid configuration file format in {path}: {reason}")]
    ConfigFileInvalid { path: PathBuf, reason: String },

    // File set errors
    #[error("Invalid input pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("No input files match {pattern}")]
    NoInputFiles { pattern: String },

    #[error(
        "Input file {path} matches the name of an output file. \
         Aborting because this would overwrite that input file"
    )]
    InputOutputCollision { path: PathBuf },

    #[error(
        "Duplicate output file name {path} detected. Use a '{{}}' placeholder in the output path \
         to name each output after the stem of its input file, e.g. 'out/{{}}_nad83csrs.laz'"
    )]
    DuplicateOutput { path: PathBuf },

    // Collaborator errors
    #[error("Point cloud format error in {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("Coordinate transformation failed: {0}")]
    Transform(String),

    #[error("Transformation cancelled by stop request")]
    Cancelled,

    // Run errors
    #[error("Worker task failed: {0}")]
    Worker(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LastrxError {
    /// Errors raised before any worker is started. Nothing has been written when one of these
    /// reaches the caller.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            LastrxError::ConfigInvalid { .. }
                | LastrxError::UnsupportedCombination { .. }
                | LastrxError::UtmZoneOutOfRange { .. }
                | LastrxError::ConfigFileUnreadable { .. }
                | LastrxError::ConfigFileInvalid { .. }
                | LastrxError::InvalidPattern { .. }
                | LastrxError::NoInputFiles { .. }
                | LastrxError::InputOutputCollision { .. }
                | LastrxError::DuplicateOutput { .. }
        )
    }

    pub fn format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        LastrxError::Format {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure of a single file, tagged with the pair it belongs to
#[derive(Debug, Error)]
#[error("Failed to transform {input} -> {output}: {source}")]
pub struct FileTransformError {
    pub input: PathBuf,
    pub output: PathBuf,
    #[source]
    pub source: LastrxError,
}

impl FileTransformError {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, source: LastrxError) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, LastrxError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, LastrxError>;
