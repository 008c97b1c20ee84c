use std::path::Path;

use crate::error::Result;

/// User id shared by all coordinate-system records
pub const CRS_RECORD_USER_ID: &str = "LASF_Projection";

/// Record ids of coordinate-system records: OGC math transform WKT, OGC CRS WKT,
/// GeoKeyDirectory, GeoDoubleParams, GeoAsciiParams
pub const CRS_RECORD_IDS: [u16; 5] = [2111, 2112, 34735, 34736, 34737];

/// Variable-length metadata record attached to a point-cloud header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub user_id: String,
    pub record_id: u16,
    pub description: String,
    pub data: Vec<u8>,
    /// Stored after the point data rather than after the header
    pub extended: bool,
}

impl MetadataRecord {
    pub fn new(
        user_id: impl Into<String>,
        record_id: u16,
        description: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            record_id,
            description: description.into(),
            data,
            extended: false,
        }
    }

    /// Whether this record describes the coordinate reference system
    pub fn is_crs_record(&self) -> bool {
        self.user_id == CRS_RECORD_USER_ID && CRS_RECORD_IDS.contains(&self.record_id)
    }
}

/// Output compression, chosen from the output path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Compressed,
}

impl Compression {
    /// `.laz` selects the compressed backend, anything else writes uncompressed
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("laz") => Compression::Compressed,
            _ => Compression::None,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Compression::Compressed)
    }
}

/// Mutable view of a point-cloud file header
pub trait PointCloudHeader: Clone {
    fn point_count(&self) -> u64;

    fn scales(&self) -> [f64; 3];

    fn set_scales(&mut self, scales: [f64; 3]);

    fn offsets(&self) -> [f64; 3];

    fn set_offsets(&mut self, offsets: [f64; 3]);

    fn records(&self) -> &[MetadataRecord];

    fn records_mut(&mut self) -> &mut Vec<MetadataRecord>;

    /// Remove every coordinate-system record, returning how many were removed.
    ///
    /// A header without such records is left untouched.
    fn strip_crs_records(&mut self) -> usize {
        let records = self.records_mut();
        let before = records.len();
        records.retain(|record| !record.is_crs_record());
        before - records.len()
    }
}

/// Batch of points read from or written to a file
pub trait PointChunk {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Real-world coordinates stacked as one triple per point
    fn xyz(&self) -> Vec<[f64; 3]>;

    /// Overwrite the coordinates, one triple per point in order
    fn set_xyz(&mut self, coords: &[[f64; 3]]) -> Result<()>;
}

/// Sequential chunked reader
pub trait ChunkReader {
    type Chunk: PointChunk;

    /// Next chunk of at most `max_points` points, `None` once the stream is exhausted
    fn read_chunk(&mut self, max_points: u64) -> Result<Option<Self::Chunk>>;
}

/// Sequential chunked writer
///
/// Dropping a writer without calling [`ChunkWriter::close`] still releases the file.
pub trait ChunkWriter {
    type Chunk: PointChunk;

    fn write_chunk(&mut self, chunk: Self::Chunk) -> Result<()>;

    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// A point-cloud file format the batch engine can stream through.
///
/// Readers and writers are created inside worker threads and never cross them.
pub trait PointCloudFormat: Send + Sync + 'static {
    type Header: PointCloudHeader + Send + 'static;
    type Chunk: PointChunk;
    type Reader: ChunkReader<Chunk = Self::Chunk>;
    type Writer: ChunkWriter<Chunk = Self::Chunk>;

    /// Human-readable format name
    fn name(&self) -> &str;

    /// Read only the header of a file
    fn read_header(&self, path: &Path) -> Result<Self::Header>;

    /// Open a file for streaming read
    fn open(&self, path: &Path) -> Result<(Self::Header, Self::Reader)>;

    /// Create a file for streaming write with a finalized header
    fn create(
        &self,
        path: &Path,
        header: &Self::Header,
        compression: Compression,
    ) -> Result<Self::Writer>;
}
