//! LAS-TRX Geo - CRS derivation, GeoTIFF records, and coordinate transformers
//!
//! This crate turns reference configurations into coordinate reference systems, encodes them
//! as GeoTIFF header records, and provides the coordinate transformers the batch engine drives.

pub mod crs;
pub mod geokeys;
pub mod transform;
pub mod validation;

pub use crs::{CrsDescriptor, HorizontalCrs, HorizontalKind, VerticalCrs};
pub use geokeys::{crs_records, GeoKey, GeoKeys};
pub use transform::{DefaultTransformerFactory, IdentityTransformer};
#[cfg(feature = "proj")]
pub use transform::ProjTransformer;
