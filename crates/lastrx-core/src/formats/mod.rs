//! Point-cloud format adapters
//!
//! Each adapter implements [`crate::ports::PointCloudFormat`] so the batch engine can stream
//! files through it chunk by chunk.

use std::path::Path;

pub mod las_io;

pub use las_io::{LasChunk, LasFormat, LasHeader, LasReader, LasWriter};

/// File extensions the LAS adapter reads and writes
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["las", "laz"];

/// Whether the path carries a LAS or LAZ extension
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
