use crate::error::Result;
use crate::models::TransformParams;

/// Transforms batches of coordinate triples.
///
/// Output has the same length and order as the input, and the same input always yields the
/// same output.
pub trait CoordinateTransformer {
    fn transform(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>>;
}

/// Builds one transformer per file task
pub trait TransformerFactory: Send + Sync + 'static {
    fn build(&self, params: &TransformParams) -> Result<Box<dyn CoordinateTransformer>>;

    /// Human-readable backend name
    fn name(&self) -> &str;
}
