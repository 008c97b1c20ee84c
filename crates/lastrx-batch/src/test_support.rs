//! In-memory point-cloud format and transformers for unit tests

use lastrx_core::error::{LastrxError, Result};
use lastrx_core::models::TransformParams;
use lastrx_core::ports::{
    ChunkReader, ChunkWriter, Compression, CoordinateTransformer, MetadataRecord, PointChunk,
    PointCloudFormat, PointCloudHeader, TransformerFactory,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::events::StopSignal;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemHeader {
    pub point_count: u64,
    pub scales: [f64; 3],
    pub offsets: [f64; 3],
    pub records: Vec<MetadataRecord>,
    pub compression: Option<Compression>,
}

impl PointCloudHeader for MemHeader {
    fn point_count(&self) -> u64 {
        self.point_count
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

#[derive(Debug, Clone)]
pub struct MemFile {
    pub header: MemHeader,
    pub points: Vec<[f64; 3]>,
}

pub struct MemChunk(Vec<[f64; 3]>);

impl PointChunk for MemChunk {
    fn len(&self) -> usize {
        self.0.len()
    }
    fn xyz(&self) -> Vec<[f64; 3]> {
        self.0.clone()
    }
    fn set_xyz(&mut self, coords: &[[f64; 3]]) -> Result<()> {
        if coords.len() != self.0.len() {
            return Err(LastrxError::Transform("length mismatch".to_string()));
        }
        self.0 = coords.to_vec();
        Ok(())
    }
}

pub struct MemReader {
    points: Vec<[f64; 3]>,
    cursor: usize,
}

impl ChunkReader for MemReader {
    type Chunk = MemChunk;

    fn read_chunk(&mut self, max_points: u64) -> Result<Option<MemChunk>> {
        if self.cursor >= self.points.len() {
            return Ok(None);
        }
        let end = (self.cursor + max_points as usize).min(self.points.len());
        let chunk = self.points[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(Some(MemChunk(chunk)))
    }
}

pub struct MemWriter {
    path: PathBuf,
    file: MemFile,
    files: Arc<Mutex<HashMap<PathBuf, MemFile>>>,
}

impl ChunkWriter for MemWriter {
    type Chunk = MemChunk;

    fn write_chunk(&mut self, chunk: MemChunk) -> Result<()> {
        self.file.points.extend(chunk.0);
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        self.file.header.point_count = self.file.points.len() as u64;
        self.files.lock().unwrap().insert(self.path.clone(), self.file.clone());
        Ok(())
    }
}

/// Files live in a shared map keyed by path; nothing touches the disk
#[derive(Debug, Clone, Default)]
pub struct MemoryFormat {
    pub files: Arc<Mutex<HashMap<PathBuf, MemFile>>>,
}

impl MemoryFormat {
    pub fn add(&self, path: impl Into<PathBuf>, points: Vec<[f64; 3]>, records: Vec<MetadataRecord>) {
        let header = MemHeader {
            point_count: points.len() as u64,
            scales: [0.001; 3],
            offsets: [0.0; 3],
            records,
            compression: None,
        };
        self.files.lock().unwrap().insert(path.into(), MemFile { header, points });
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<MemFile> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    fn lookup(&self, path: &Path) -> Result<MemFile> {
        self.get(path)
            .ok_or_else(|| LastrxError::format(path, "no such file"))
    }
}

impl PointCloudFormat for MemoryFormat {
    type Header = MemHeader;
    type Chunk = MemChunk;
    type Reader = MemReader;
    type Writer = MemWriter;

    fn name(&self) -> &str {
        "memory"
    }

    fn read_header(&self, path: &Path) -> Result<MemHeader> {
        Ok(self.lookup(path)?.header)
    }

    fn open(&self, path: &Path) -> Result<(MemHeader, MemReader)> {
        let file = self.lookup(path)?;
        Ok((
            file.header,
            MemReader {
                points: file.points,
                cursor: 0,
            },
        ))
    }

    fn create(&self, path: &Path, header: &MemHeader, compression: Compression) -> Result<MemWriter> {
        let mut header = header.clone();
        header.compression = Some(compression);
        Ok(MemWriter {
            path: path.to_path_buf(),
            file: MemFile {
                header,
                points: Vec::new(),
            },
            files: Arc::clone(&self.files),
        })
    }
}

/// Adds a fixed offset to every coordinate
pub struct Shift(pub [f64; 3]);

impl CoordinateTransformer for Shift {
    fn transform(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>> {
        let [dx, dy, dz] = self.0;
        Ok(coords.iter().map(|[x, y, z]| [x + dx, y + dy, z + dz]).collect())
    }
}

pub struct ShiftFactory(pub [f64; 3]);

impl TransformerFactory for ShiftFactory {
    fn build(&self, _params: &TransformParams) -> Result<Box<dyn CoordinateTransformer>> {
        Ok(Box::new(Shift(self.0)))
    }

    fn name(&self) -> &str {
        "shift"
    }
}

/// Panics when asked to transform a point whose x equals the trigger value
pub struct PanicOn(pub f64);

impl CoordinateTransformer for PanicOn {
    fn transform(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>> {
        if coords.iter().any(|c| c[0] == self.0) {
            panic!("transformer exploded");
        }
        Ok(coords.to_vec())
    }
}

pub struct PanicFactory(pub f64);

impl TransformerFactory for PanicFactory {
    fn build(&self, _params: &TransformParams) -> Result<Box<dyn CoordinateTransformer>> {
        Ok(Box::new(PanicOn(self.0)))
    }

    fn name(&self) -> &str {
        "panic"
    }
}

/// Passes coordinates through and requests a stop on the `limit`-th call, counted across files
pub struct StopAfter {
    calls: Arc<AtomicUsize>,
    limit: usize,
    stop: StopSignal,
}

impl CoordinateTransformer for StopAfter {
    fn transform(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.limit {
            self.stop.stop();
        }
        Ok(coords.to_vec())
    }
}

pub struct StopAfterFactory {
    pub calls: Arc<AtomicUsize>,
    limit: usize,
    stop: StopSignal,
}

impl StopAfterFactory {
    pub fn new(limit: usize, stop: StopSignal) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            limit,
            stop,
        }
    }
}

impl TransformerFactory for StopAfterFactory {
    fn build(&self, _params: &TransformParams) -> Result<Box<dyn CoordinateTransformer>> {
        Ok(Box::new(StopAfter {
            calls: Arc::clone(&self.calls),
            limit: self.limit,
            stop: self.stop.clone(),
        }))
    }

    fn name(&self) -> &str {
        "stop-after"
    }
}

/// Refuses to build any transformer
pub struct RefusingFactory;

impl TransformerFactory for RefusingFactory {
    fn build(&self, _params: &TransformParams) -> Result<Box<dyn CoordinateTransformer>> {
        Err(LastrxError::Transform("no backend".to_string()))
    }

    fn name(&self) -> &str {
        "refusing"
    }
}

pub fn line(n: usize, start: f64) -> Vec<[f64; 3]> {
    (0..n).map(|i| [start + i as f64, 100.0 - i as f64, 1.0]).collect()
}
