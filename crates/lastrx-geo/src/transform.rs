//! Coordinate transformer implementations

use lastrx_core::error::{LastrxError, Result};
use lastrx_core::models::{ReferenceConfig, TransformConfig, TransformParams};
use lastrx_core::ports::{CoordinateTransformer, TransformerFactory};

#[cfg(feature = "proj")]
use crate::crs::CrsDescriptor;

/// Returns coordinates unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl CoordinateTransformer for IdentityTransformer {
    fn transform(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>> {
        Ok(coords.to_vec())
    }
}

/// Horizontal conversion through PROJ; heights pass through unchanged.
///
/// Only requests whose two sides share epoch and vertical datum, and neither of which is
/// geocentric, are accepted.
#[cfg(feature = "proj")]
pub struct ProjTransformer {
    proj: proj::Proj,
}

#[cfg(feature = "proj")]
impl ProjTransformer {
    pub fn new(origin: &ReferenceConfig, destination: &ReferenceConfig) -> Result<Self> {
        if origin.epoch != destination.epoch || origin.vertical_datum != destination.vertical_datum
        {
            return Err(unsupported(origin, destination, "epoch or vertical datum change"));
        }

        let from = CrsDescriptor::from_reference(origin)?;
        let to = CrsDescriptor::from_reference(destination)?;
        if from.is_geocentric() || to.is_geocentric() {
            return Err(unsupported(origin, destination, "cartesian coordinates"));
        }

        let proj = proj::Proj::new_known_crs(
            &from.horizontal.proj_definition,
            &to.horizontal.proj_definition,
            None,
        )
        .map_err(|e| {
            LastrxError::Transform(format!(
                "Failed to create projection from {} to {}: {}",
                from.horizontal.proj_definition, to.horizontal.proj_definition, e
            ))
        })?;

        tracing::debug!(
            "PROJ transformer {} -> {}",
            from.horizontal.proj_definition,
            to.horizontal.proj_definition
        );
        Ok(Self { proj })
    }
}

#[cfg(feature = "proj")]
impl CoordinateTransformer for ProjTransformer {
    fn transform(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>> {
        if coords.is_empty() {
            return Ok(Vec::new());
        }

        // One PROJ call per chunk
        let mut horizontal: Vec<(f64, f64)> = coords.iter().map(|&[x, y, _]| (x, y)).collect();
        self.proj
            .convert_array(&mut horizontal)
            .map_err(|e| LastrxError::Transform(format!("Projection failed: {}", e)))?;

        Ok(horizontal
            .into_iter()
            .zip(coords)
            .map(|((x, y), &[_, _, z])| [x, y, z])
            .collect())
    }
}

fn unsupported(origin: &ReferenceConfig, destination: &ReferenceConfig, what: &str) -> LastrxError {
    LastrxError::Transform(format!(
        "no geodetic backend for {} -> {} ({})",
        origin, destination, what
    ))
}

/// Factory used by the command line: identity when both sides agree, PROJ otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransformerFactory;

impl DefaultTransformerFactory {
    pub fn new() -> Self {
        Self
    }

    /// Whether the PROJ backend is compiled in
    pub fn has_proj() -> bool {
        cfg!(feature = "proj")
    }

    /// Build a transformer from the calendar-date configuration
    pub fn build_for(&self, config: &TransformConfig) -> Result<Box<dyn CoordinateTransformer>> {
        if config.is_identity() {
            return Ok(Box::new(IdentityTransformer));
        }
        self.build_non_identity(&config.origin, &config.destination)
    }

    #[cfg(feature = "proj")]
    fn build_non_identity(
        &self,
        origin: &ReferenceConfig,
        destination: &ReferenceConfig,
    ) -> Result<Box<dyn CoordinateTransformer>> {
        Ok(Box::new(ProjTransformer::new(origin, destination)?))
    }

    #[cfg(not(feature = "proj"))]
    fn build_non_identity(
        &self,
        origin: &ReferenceConfig,
        destination: &ReferenceConfig,
    ) -> Result<Box<dyn CoordinateTransformer>> {
        Err(unsupported(origin, destination, "built without the `proj` feature"))
    }
}

impl TransformerFactory for DefaultTransformerFactory {
    fn build(&self, params: &TransformParams) -> Result<Box<dyn CoordinateTransformer>> {
        if params.is_identity() {
            tracing::debug!("Origin and destination agree, using identity transformer");
            return Ok(Box::new(IdentityTransformer));
        }

        let origin = reference_from_params(&params.origin)?;
        let destination = reference_from_params(&params.destination)?;
        self.build_non_identity(&origin, &destination)
    }

    fn name(&self) -> &str {
        if Self::has_proj() {
            "identity + PROJ"
        } else {
            "identity"
        }
    }
}

fn reference_from_params(
    params: &lastrx_core::models::ReferenceParams,
) -> Result<ReferenceConfig> {
    ReferenceConfig::new(
        params.ref_frame,
        lastrx_core::models::date_from_decimal_year(params.epoch)?,
        params.vertical_datum,
        params.coord_type,
    )
}
