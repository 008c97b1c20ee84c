//! Streaming transformation of a single file

use lastrx_core::error::{FileTransformError, LastrxError, Result};
use lastrx_core::models::TransformParams;
use lastrx_core::ports::{
    ChunkReader, ChunkWriter, Compression, CoordinateTransformer, MetadataRecord, PointChunk,
    PointCloudFormat, PointCloudHeader, TransformerFactory,
};
use lastrx_geo::validation::ensure_finite;
use std::sync::Arc;

use crate::events::StopSignal;
use crate::fileset::FilePair;
use crate::progress::ProgressCounter;

/// Coordinate scale written to every output header: one centimetre in the destination unit
pub const OUTPUT_SCALE: f64 = 0.01;

/// Read-only inputs shared by every file task of a run
#[derive(Debug, Clone)]
pub struct FileTaskContext {
    pub params: TransformParams,
    /// Destination CRS records appended to each output header
    pub crs_records: Arc<Vec<MetadataRecord>>,
    pub chunk_size: u64,
    pub counter: ProgressCounter,
    pub stop: StopSignal,
}

/// What one finished file task wrote
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub points: u64,
    pub chunks: u64,
    pub offsets: [f64; 3],
}

/// Transform `pair.input` into `pair.output`.
///
/// Any failure is tagged with the pair. Reader and writer are released on every path; a
/// failed run may leave a partial output file behind.
pub fn transform_file<F, T>(
    format: &F,
    factory: &T,
    pair: &FilePair,
    ctx: &FileTaskContext,
) -> std::result::Result<FileSummary, FileTransformError>
where
    F: PointCloudFormat,
    T: TransformerFactory + ?Sized,
{
    run(format, factory, pair, ctx).map_err(|source| {
        if !matches!(source, LastrxError::Cancelled) {
            tracing::debug!("{} failed: {}", pair.input.display(), source);
        }
        FileTransformError::new(&pair.input, &pair.output, source)
    })
}

fn run<F, T>(format: &F, factory: &T, pair: &FilePair, ctx: &FileTaskContext) -> Result<FileSummary>
where
    F: PointCloudFormat,
    T: TransformerFactory + ?Sized,
{
    let transformer = factory.build(&ctx.params)?;
    let chunk_size = ctx.chunk_size.max(1);

    let (mut header, mut reader) = format.open(&pair.input)?;

    let stripped = header.strip_crs_records();
    header.records_mut().extend(ctx.crs_records.iter().cloned());
    header.set_scales([OUTPUT_SCALE; 3]);

    // Offsets come from the first chunk only
    let offsets = match reader.read_chunk(chunk_size)? {
        Some(first) => component_min(&transform_chunk(transformer.as_ref(), &first)?),
        None => header.offsets(),
    };
    header.set_offsets(offsets);
    drop(reader);

    let compression = Compression::from_path(&pair.output);
    tracing::debug!(
        "{}: stripped {} CRS record(s), wrote {}, scale {}, offsets {:?}, compressed {}",
        pair.output.display(),
        stripped,
        ctx.crs_records.len(),
        OUTPUT_SCALE,
        offsets,
        compression.is_compressed()
    );

    let mut writer = format.create(&pair.output, &header, compression)?;
    let (_, mut reader) = format.open(&pair.input)?;

    let mut points = 0u64;
    let mut chunks = 0u64;
    loop {
        if ctx.stop.is_stopped() {
            return Err(LastrxError::Cancelled);
        }
        let Some(mut chunk) = reader.read_chunk(chunk_size)? else {
            break;
        };

        let coords = transform_chunk(transformer.as_ref(), &chunk)?;
        chunk.set_xyz(&coords)?;
        points += chunk.len() as u64;
        writer.write_chunk(chunk)?;

        chunks += 1;
        ctx.counter.increment();
    }

    writer.close()?;
    tracing::debug!("{}: wrote {} points in {} chunk(s)", pair.output.display(), points, chunks);

    Ok(FileSummary {
        points,
        chunks,
        offsets,
    })
}

/// Push a whole chunk through the transformer in one call
fn transform_chunk<C: PointChunk>(
    transformer: &dyn CoordinateTransformer,
    chunk: &C,
) -> Result<Vec<[f64; 3]>> {
    let coords = transformer.transform(&chunk.xyz())?;
    if coords.len() != chunk.len() {
        return Err(LastrxError::Transform(format!(
            "transformer returned {} points for a chunk of {}",
            coords.len(),
            chunk.len()
        )));
    }
    ensure_finite(&coords)?;
    Ok(coords)
}

fn component_min(coords: &[[f64; 3]]) -> [f64; 3] {
    coords.iter().fold([f64::INFINITY; 3], |acc, c| {
        [acc[0].min(c[0]), acc[1].min(c[1]), acc[2].min(c[2])]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        line, MemoryFormat, PanicFactory, RefusingFactory, ShiftFactory, StopAfterFactory,
    };
    use chrono::NaiveDate;
    use lastrx_core::models::{CoordType, ReferenceConfig, ReferenceFrame, TransformConfig, VerticalDatum};
    use lastrx_core::ports::CRS_RECORD_USER_ID;

    fn params() -> TransformParams {
        let side = ReferenceConfig::new(
            ReferenceFrame::Nad83Csrs,
            NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            VerticalDatum::Grs80,
            CoordType::Geographic,
        )
        .unwrap();
        TransformConfig::new(side, side, 1).unwrap().to_params()
    }

    fn context(chunk_size: u64) -> FileTaskContext {
        FileTaskContext {
            params: params(),
            crs_records: Arc::new(vec![MetadataRecord::new(
                CRS_RECORD_USER_ID,
                34735,
                "GeoTIFF GeoKeyDirectoryTag",
                vec![1, 0, 1, 0, 0, 0, 0, 0],
            )]),
            chunk_size,
            counter: ProgressCounter::new(),
            stop: StopSignal::new(),
        }
    }

    #[test]
    fn test_streams_all_chunks_and_rewrites_header() {
        let format = MemoryFormat::default();
        format.add(
            "in/a",
            line(25, 10.0),
            vec![
                MetadataRecord::new(CRS_RECORD_USER_ID, 34737, "old", b"old|\0".to_vec()),
                MetadataRecord::new("LASF_Spec", 3, "keep", vec![]),
            ],
        );
        let ctx = context(10);
        let pair = FilePair::new("in/a", "out/a.laz");

        let summary = transform_file(&format, &ShiftFactory([1.0, 2.0, 3.0]), &pair, &ctx).unwrap();
        assert_eq!(summary.points, 25);
        assert_eq!(summary.chunks, 3);
        assert_eq!(ctx.counter.get(), 3);

        // First chunk holds x 10..19 and y 100..91, shifted
        assert_eq!(summary.offsets, [11.0, 93.0, 4.0]);

        let out = format.get("out/a.laz").unwrap();
        assert_eq!(out.header.point_count, 25);
        assert_eq!(out.header.scales, [OUTPUT_SCALE; 3]);
        assert_eq!(out.header.offsets, [11.0, 93.0, 4.0]);
        assert_eq!(out.header.compression, Some(Compression::Compressed));
        let ids: Vec<u16> = out.header.records.iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec![3, 34735]);
        assert_eq!(out.points[24], [35.0, 78.0, 4.0]);
    }

    #[test]
    fn test_chunk_size_does_not_change_output() {
        let format = MemoryFormat::default();
        format.add("in/a", line(37, 0.0), vec![]);
        let factory = ShiftFactory([0.5, -0.5, 0.25]);

        transform_file(&format, &factory, &FilePair::new("in/a", "one.las"), &context(37)).unwrap();
        transform_file(&format, &factory, &FilePair::new("in/a", "many.las"), &context(4)).unwrap();

        let one = format.get("one.las").unwrap();
        let many = format.get("many.las").unwrap();
        assert_eq!(one.points, many.points);
        assert_eq!(many.header.compression, Some(Compression::None));
    }

    #[test]
    fn test_empty_file_keeps_offsets() {
        let format = MemoryFormat::default();
        format.add("in/empty", vec![], vec![]);
        let ctx = context(10);

        let summary =
            transform_file(&format, &ShiftFactory([1.0; 3]), &FilePair::new("in/empty", "e.laz"), &ctx)
                .unwrap();
        assert_eq!(summary.chunks, 0);
        assert_eq!(summary.offsets, [0.0; 3]);
        assert_eq!(format.get("e.laz").unwrap().header.point_count, 0);
    }

    #[test]
    fn test_errors_carry_the_pair() {
        let format = MemoryFormat::default();
        let pair = FilePair::new("in/missing", "out/missing.laz");

        let err = transform_file(&format, &ShiftFactory([0.0; 3]), &pair, &context(10)).unwrap_err();
        assert_eq!(err.input, pair.input);
        assert_eq!(err.output, pair.output);
        assert!(matches!(err.source, LastrxError::Format { .. }));

        format.add("in/a", line(3, 0.0), vec![]);
        let err = transform_file(&format, &RefusingFactory, &FilePair::new("in/a", "o"), &context(10))
            .unwrap_err();
        assert!(matches!(err.source, LastrxError::Transform(_)));
    }

    #[test]
    fn test_stop_is_checked_per_chunk() {
        let format = MemoryFormat::default();
        format.add("in/a", line(30, 0.0), vec![]);
        let ctx = context(10);
        ctx.stop.stop();

        let err = transform_file(&format, &ShiftFactory([0.0; 3]), &FilePair::new("in/a", "o.laz"), &ctx)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(ctx.counter.get(), 0);
    }

    #[test]
    fn test_stop_between_chunks_cancels_the_file() {
        let format = MemoryFormat::default();
        format.add("in/a", line(30, 0.0), vec![]);
        let ctx = context(10);
        // First call sizes the offsets, second transforms the first written chunk
        let factory = StopAfterFactory::new(2, ctx.stop.clone());

        let err = transform_file(&format, &factory, &FilePair::new("in/a", "o.laz"), &ctx)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(ctx.counter.get(), 1);
        assert_eq!(factory.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        // Writer never closed
        assert!(format.get("o.laz").is_none());
    }

    #[test]
    #[should_panic(expected = "transformer exploded")]
    fn test_transformer_panic_propagates_to_caller() {
        let format = MemoryFormat::default();
        format.add("in/a", line(3, 0.0), vec![]);
        let _ = transform_file(&format, &PanicFactory(1.0), &FilePair::new("in/a", "o"), &context(10));
    }
}
