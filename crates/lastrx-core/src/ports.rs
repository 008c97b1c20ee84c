//! Port trait definitions
//!
//! These traits define the collaborators the batch engine drives: the point-cloud file format
//! and the coordinate transformer.

pub mod format;
pub mod transformer;

pub use format::{
    ChunkReader, ChunkWriter, Compression, MetadataRecord, PointChunk, PointCloudFormat,
    PointCloudHeader, CRS_RECORD_IDS, CRS_RECORD_USER_ID,
};
pub use transformer::{CoordinateTransformer, TransformerFactory};
