//! Integration tests for the LAS/LAZ format adapter

use las::{Read, Write};
use lastrx_core::formats::LasFormat;
use lastrx_core::ports::{
    ChunkReader, ChunkWriter, Compression, MetadataRecord, PointChunk, PointCloudFormat,
    PointCloudHeader,
};
use std::path::Path;
use tempfile::TempDir;

fn write_las(path: &Path, points: &[[f64; 3]], vlrs: Vec<las::Vlr>) {
    let mut builder = las::Builder::from((1, 2));
    builder.point_format = las::point::Format::new(0).unwrap();
    builder.transforms = las::Vector {
        x: las::Transform {
            scale: 0.001,
            offset: 0.0,
        },
        y: las::Transform {
            scale: 0.001,
            offset: 0.0,
        },
        z: las::Transform {
            scale: 0.001,
            offset: 0.0,
        },
    };
    builder.vlrs = vlrs;
    let header = builder.into_header().unwrap();

    let mut writer = las::Writer::from_path(path, header).unwrap();
    for &[x, y, z] in points {
        writer
            .write(las::Point {
                x,
                y,
                z,
                ..Default::default()
            })
            .unwrap();
    }
    writer.close().unwrap();
}

fn crs_vlr(record_id: u16) -> las::Vlr {
    las::Vlr {
        user_id: "LASF_Projection".to_string(),
        record_id,
        description: "source crs".to_string(),
        data: vec![1, 0, 1, 0, 0, 0, 0, 0],
    }
}

fn sample_points(n: usize) -> Vec<[f64; 3]> {
    (0..n)
        .map(|i| [1000.0 + i as f64, 2000.0 + i as f64 * 0.5, 10.0 + i as f64 * 0.25])
        .collect()
}

#[test]
fn test_read_header_and_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tile.las");
    let other = las::Vlr {
        user_id: "LASF_Spec".to_string(),
        record_id: 3,
        description: "text".to_string(),
        data: b"hello".to_vec(),
    };
    write_las(&path, &sample_points(25), vec![crs_vlr(34735), other]);

    let header = LasFormat::new().read_header(&path).unwrap();
    assert_eq!(header.point_count(), 25);
    assert_eq!(header.scales(), [0.001; 3]);
    assert_eq!(header.version(), "1.2");
    assert_eq!(header.point_format(), Some(0));
    assert_eq!(header.records().len(), 2);
    assert!(header.records()[0].is_crs_record());
    assert!(!header.records()[1].is_crs_record());
}

#[test]
fn test_chunked_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tile.las");
    write_las(&path, &sample_points(25), vec![]);

    let (_, mut reader) = LasFormat::new().open(&path).unwrap();
    let mut sizes = Vec::new();
    while let Some(chunk) = reader.read_chunk(10).unwrap() {
        sizes.push(chunk.len());
    }
    assert_eq!(sizes, vec![10, 10, 5]);
}

#[test]
fn test_rewrite_header_and_points() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.las");
    let output = dir.path().join("out.laz");
    let points = sample_points(12);
    write_las(&input, &points, vec![crs_vlr(34735), crs_vlr(2112)]);

    let format = LasFormat::new();
    let (mut header, mut reader) = format.open(&input).unwrap();
    assert_eq!(header.strip_crs_records(), 2);
    header.records_mut().push(MetadataRecord::new(
        "LASF_Projection",
        34737,
        "GeoTIFF GeoAsciiParamsTag",
        b"NAD83(CSRS)|\0".to_vec(),
    ));
    header.set_scales([0.01; 3]);
    header.set_offsets([900.0, 1900.0, 0.0]);

    let mut writer = format
        .create(&output, &header, Compression::from_path(&output))
        .unwrap();
    while let Some(mut chunk) = reader.read_chunk(5).unwrap() {
        let shifted: Vec<[f64; 3]> = chunk
            .xyz()
            .into_iter()
            .map(|[x, y, z]| [x + 1.0, y, z])
            .collect();
        chunk.set_xyz(&shifted).unwrap();
        writer.write_chunk(chunk).unwrap();
    }
    writer.close().unwrap();

    let mut check = las::Reader::from_path(&output).unwrap();
    let out_header = check.header().clone();
    assert_eq!(out_header.number_of_points(), 12);
    assert!(out_header.point_format().is_compressed);
    assert_eq!(out_header.transforms().x.scale, 0.01);
    assert_eq!(out_header.transforms().x.offset, 900.0);

    let crs_records: Vec<_> = out_header
        .vlrs()
        .iter()
        .filter(|v| v.user_id == "LASF_Projection")
        .collect();
    assert_eq!(crs_records.len(), 1);
    assert_eq!(crs_records[0].record_id, 34737);

    let read_back: Vec<las::Point> = check.points().map(|p| p.unwrap()).collect();
    for (point, [x, y, z]) in read_back.iter().zip(&points) {
        assert!((point.x - (x + 1.0)).abs() < 0.006);
        assert!((point.y - y).abs() < 0.006);
        assert!((point.z - z).abs() < 0.006);
    }
}

#[test]
fn test_set_xyz_length_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tile.las");
    write_las(&path, &sample_points(3), vec![]);

    let (_, mut reader) = LasFormat::new().open(&path).unwrap();
    let mut chunk = reader.read_chunk(10).unwrap().unwrap();
    assert!(chunk.set_xyz(&[[0.0; 3]]).is_err());
}

#[test]
fn test_missing_file_is_format_error() {
    let err = LasFormat::new()
        .read_header(Path::new("/no/such/tile.las"))
        .unwrap_err();
    assert!(matches!(err, lastrx_core::LastrxError::Format { .. }));
}
