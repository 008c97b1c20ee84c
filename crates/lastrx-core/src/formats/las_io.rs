//! LAS/LAZ adapter over the `las` crate

use las::{Read, Write};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{LastrxError, Result};
use crate::ports::{
    ChunkReader, ChunkWriter, Compression, MetadataRecord, PointChunk, PointCloudFormat,
    PointCloudHeader,
};

/// User id of the record the LAZ backend manages itself
const LASZIP_USER_ID: &str = "laszip encoded";

/// LAS 1.0-1.4 files, compressed or not
#[derive(Debug, Clone, Copy, Default)]
pub struct LasFormat;

impl LasFormat {
    pub fn new() -> Self {
        Self
    }
}

impl PointCloudFormat for LasFormat {
    type Header = LasHeader;
    type Chunk = LasChunk;
    type Reader = LasReader;
    type Writer = LasWriter;

    fn name(&self) -> &str {
        "LAS/LAZ"
    }

    fn read_header(&self, path: &Path) -> Result<LasHeader> {
        let reader = open_reader(path)?;
        Ok(LasHeader::from_las(reader.header().clone()))
    }

    fn open(&self, path: &Path) -> Result<(LasHeader, LasReader)> {
        let reader = open_reader(path)?;
        let header = LasHeader::from_las(reader.header().clone());
        Ok((
            header,
            LasReader {
                path: path.to_path_buf(),
                inner: reader,
            },
        ))
    }

    fn create(&self, path: &Path, header: &LasHeader, compression: Compression) -> Result<LasWriter> {
        let las_header = header.to_las(compression, path)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LastrxError::format(path, e))?;
        }
        let writer =
            las::Writer::from_path(path, las_header).map_err(|e| LastrxError::format(path, e))?;

        tracing::debug!(
            "Created {} ({})",
            path.display(),
            if compression.is_compressed() { "compressed" } else { "uncompressed" }
        );

        Ok(LasWriter {
            path: path.to_path_buf(),
            inner: writer,
        })
    }
}

fn open_reader(path: &Path) -> Result<las::Reader<'static>> {
    las::Reader::from_path(path).map_err(|e| LastrxError::format(path, e))
}

/// Header of a LAS file with editable scale, offset, and records
#[derive(Debug, Clone)]
pub struct LasHeader {
    source: las::Header,
    scales: [f64; 3],
    offsets: [f64; 3],
    records: Vec<MetadataRecord>,
}

impl LasHeader {
    pub fn from_las(source: las::Header) -> Self {
        let transforms = *source.transforms();
        let records = source
            .vlrs()
            .iter()
            .map(|vlr| record_from_vlr(vlr, false))
            .chain(source.evlrs().iter().map(|vlr| record_from_vlr(vlr, true)))
            .filter(|record| record.user_id != LASZIP_USER_ID)
            .collect();

        Self {
            scales: [transforms.x.scale, transforms.y.scale, transforms.z.scale],
            offsets: [transforms.x.offset, transforms.y.offset, transforms.z.offset],
            records,
            source,
        }
    }

    /// LAS version, e.g. `1.2`
    pub fn version(&self) -> String {
        self.source.version().to_string()
    }

    /// Point data record format number
    pub fn point_format(&self) -> Option<u8> {
        self.source.point_format().to_u8().ok()
    }

    pub fn is_compressed(&self) -> bool {
        self.source.point_format().is_compressed
    }

    pub fn system_identifier(&self) -> &str {
        self.source.system_identifier()
    }

    pub fn generating_software(&self) -> &str {
        self.source.generating_software()
    }

    /// Bounding box as `(min, max)` in real-world units
    pub fn bounds(&self) -> ([f64; 3], [f64; 3]) {
        let bounds = self.source.bounds();
        (
            [bounds.min.x, bounds.min.y, bounds.min.z],
            [bounds.max.x, bounds.max.y, bounds.max.z],
        )
    }

    /// Build the header handed to the `las` writer
    fn to_las(&self, compression: Compression, path: &Path) -> Result<las::Header> {
        let mut builder = las::Builder::from(self.source.clone());
        builder.point_format.is_compressed = compression.is_compressed();
        builder.transforms = las::Vector {
            x: las::Transform {
                scale: self.scales[0],
                offset: self.offsets[0],
            },
            y: las::Transform {
                scale: self.scales[1],
                offset: self.offsets[1],
            },
            z: las::Transform {
                scale: self.scales[2],
                offset: self.offsets[2],
            },
        };
        builder.vlrs = self
            .records
            .iter()
            .filter(|record| !record.extended)
            .map(vlr_from_record)
            .collect();
        builder.evlrs = self
            .records
            .iter()
            .filter(|record| record.extended)
            .map(vlr_from_record)
            .collect();

        builder.into_header().map_err(|e| LastrxError::format(path, e))
    }
}

impl PointCloudHeader for LasHeader {
    fn point_count(&self) -> u64 {
        self.source.number_of_points()
    }

    fn scales(&self) -> [f64; 3] {
        self.scales
    }

    fn set_scales(&mut self, scales: [f64; 3]) {
        self.scales = scales;
    }

    fn offsets(&self) -> [f64; 3] {
        self.offsets
    }

    fn set_offsets(&mut self, offsets: [f64; 3]) {
        self.offsets = offsets;
    }

    fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    fn records_mut(&mut self) -> &mut Vec<MetadataRecord> {
        &mut self.records
    }
}

fn record_from_vlr(vlr: &las::Vlr, extended: bool) -> MetadataRecord {
    MetadataRecord {
        user_id: vlr.user_id.clone(),
        record_id: vlr.record_id,
        description: vlr.description.clone(),
        data: vlr.data.clone(),
        extended,
    }
}

fn vlr_from_record(record: &MetadataRecord) -> las::Vlr {
    las::Vlr {
        user_id: record.user_id.clone(),
        record_id: record.record_id,
        description: record.description.clone(),
        data: record.data.clone(),
    }
}

/// Points of one chunk, coordinates in real-world units
#[derive(Debug, Clone, Default)]
pub struct LasChunk {
    points: Vec<las::Point>,
}

impl LasChunk {
    pub fn points(&self) -> &[las::Point] {
        &self.points
    }
}

impl From<Vec<las::Point>> for LasChunk {
    fn from(points: Vec<las::Point>) -> Self {
        Self { points }
    }
}

impl PointChunk for LasChunk {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn xyz(&self) -> Vec<[f64; 3]> {
        self.points.iter().map(|p| [p.x, p.y, p.z]).collect()
    }

    fn set_xyz(&mut self, coords: &[[f64; 3]]) -> Result<()> {
        if coords.len() != self.points.len() {
            return Err(LastrxError::Transform(format!(
                "expected {} coordinates, got {}",
                self.points.len(),
                coords.len()
            )));
        }

        for (point, [x, y, z]) in self.points.iter_mut().zip(coords) {
            point.x = *x;
            point.y = *y;
            point.z = *z;
        }
        Ok(())
    }
}

/// Streaming reader over a LAS/LAZ file
pub struct LasReader {
    path: PathBuf,
    inner: las::Reader<'static>,
}

impl ChunkReader for LasReader {
    type Chunk = LasChunk;

    fn read_chunk(&mut self, max_points: u64) -> Result<Option<LasChunk>> {
        let mut points = Vec::with_capacity(max_points.min(1 << 20) as usize);
        while (points.len() as u64) < max_points {
            match self.inner.read() {
                Some(point) => points.push(point.map_err(|e| LastrxError::format(&self.path, e))?),
                None => break,
            }
        }

        if points.is_empty() {
            Ok(None)
        } else {
            Ok(Some(LasChunk { points }))
        }
    }
}

/// Streaming writer into a LAS/LAZ file.
///
/// The `las` writer finalizes the file when dropped, so early returns still release it.
pub struct LasWriter {
    path: PathBuf,
    inner: las::Writer<BufWriter<File>>,
}

impl ChunkWriter for LasWriter {
    type Chunk = LasChunk;

    fn write_chunk(&mut self, chunk: LasChunk) -> Result<()> {
        for point in chunk.points {
            self.inner
                .write(point)
                .map_err(|e| LastrxError::format(&self.path, e))?;
        }
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        self.inner
            .close()
            .map_err(|e| LastrxError::format(&self.path, e))
    }
}
