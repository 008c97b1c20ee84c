//! Inspect command implementation

use crate::cli::InspectArgs;
use crate::output::OutputWriter;
use crate::output_types::{GeoKeyRow, InspectOutput, RecordRow};
use anyhow::Result;
use lastrx_core::formats::{LasFormat, LasHeader};
use lastrx_core::ports::{PointCloudFormat, PointCloudHeader};
use lastrx_geo::GeoKeys;
use std::path::Path;

pub fn execute(args: InspectArgs, output: &OutputWriter) -> Result<()> {
    let header = LasFormat::new().read_header(&args.path)?;
    let inspected = inspect_header(&args.path, &header);

    if output.is_json() {
        return output.result(&inspected);
    }

    output.section(format!("{}", inspected.path));
    output.kv("LAS version", &inspected.version);
    output.kv(
        "Point format",
        inspected
            .point_format
            .map(|f| f.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    );
    output.kv("Compressed", inspected.compressed);
    output.kv("Points", inspected.point_count);
    output.kv("Scales", format_triple(inspected.scales));
    output.kv("Offsets", format_triple(inspected.offsets));
    output.kv("Min", format_triple(inspected.min));
    output.kv("Max", format_triple(inspected.max));
    output.kv("System identifier", &inspected.system_identifier);
    output.kv("Generating software", &inspected.generating_software);

    output.section("Records");
    output.table(inspected.records);

    if inspected.geokeys.is_empty() {
        output.info("No GeoTIFF keys found");
    } else {
        output.section("GeoTIFF Keys");
        output.table(inspected.geokeys);
        for citation in &inspected.citations {
            output.kv("Citation", citation);
        }
    }

    Ok(())
}

/// Header summary plus decoded coordinate-system keys
pub fn inspect_header(path: &Path, header: &LasHeader) -> InspectOutput {
    let records = header
        .records()
        .iter()
        .map(|record| RecordRow {
            user_id: record.user_id.clone(),
            record_id: record.record_id,
            description: record.description.clone(),
            length: record.data.len(),
            crs: record.is_crs_record(),
            extended: record.extended,
        })
        .collect();

    let (geokeys, citations) = match GeoKeys::from_records(header.records()) {
        Some(keys) => {
            let rows = keys
                .keys
                .iter()
                .map(|key| GeoKeyRow {
                    id: key.id,
                    location: key.tiff_tag_location,
                    count: key.count,
                    value: match key.tiff_tag_location {
                        0 => key.value_offset.to_string(),
                        _ => keys
                            .citation(key.id)
                            .unwrap_or_else(|| format!("offset {}", key.value_offset)),
                    },
                })
                .collect();
            (rows, keys.citations.clone())
        }
        None => (Vec::new(), Vec::new()),
    };

    let (min, max) = header.bounds();

    InspectOutput {
        path: path.display().to_string(),
        version: header.version(),
        point_format: header.point_format(),
        compressed: header.is_compressed(),
        point_count: header.point_count(),
        scales: header.scales(),
        offsets: header.offsets(),
        min,
        max,
        system_identifier: header.system_identifier().to_string(),
        generating_software: header.generating_software().to_string(),
        records,
        geokeys,
        citations,
    }
}

fn format_triple(values: [f64; 3]) -> String {
    format!("{}, {}, {}", values[0], values[1], values[2])
}
