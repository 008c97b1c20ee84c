use lastrx_core::error::{LastrxError, Result};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }
}

/// Maximum number of errors collected before validation stops looking
const MAX_REPORTED: usize = 5;

/// Validate transformed coordinates: every component must be finite
pub fn validate_coordinates(coords: &[[f64; 3]]) -> ValidationResult {
    let mut result = ValidationResult::valid();

    for (i, [x, y, z]) in coords.iter().enumerate() {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            result.add_error(
                format!("Point[{}] ({}, {}, {})", i, x, y, z),
                "Coordinates must be finite".to_string(),
            );
            if result.errors.len() >= MAX_REPORTED {
                break;
            }
        }
    }

    result
}

/// Fail with a transformation error if any coordinate is not finite
pub fn ensure_finite(coords: &[[f64; 3]]) -> Result<()> {
    let validation = validate_coordinates(coords);
    if validation.is_valid {
        return Ok(());
    }

    let first = validation
        .errors
        .first()
        .map(|e| format!("{}: {}", e.location, e.reason))
        .unwrap_or_else(|| "Invalid coordinates".to_string());
    Err(LastrxError::Transform(format!(
        "{} point(s) with non-finite coordinates, first at {}",
        count_invalid_coordinates(coords),
        first
    )))
}

/// Count points with non-finite coordinates
pub fn count_invalid_coordinates(coords: &[[f64; 3]]) -> usize {
    coords.iter().filter(|c| !c.iter().all(|v| v.is_finite())).count()
}
