//! Small value validators shared by configuration loading and geometry input.

use std::ops::RangeInclusive;

/// Tolerance used when checking that a direction vector has unit length.
pub const UNIT_VECTOR_TOLERANCE: f64 = 1e-6;

/// Validates that every component of a vector is finite.
///
/// # Arguments
///
/// * `vector` - The 3-vector to validate.
///
/// # Returns
///
/// * `Ok(())` if all components are finite.
/// * `Err(&'static str)` if any component is NaN or infinite.
pub fn is_finite_vector(vector: &[f64; 3]) -> Result<(), &'static str> {
    if vector.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err("Vector components must be finite")
    }
}

/// Validates that a direction vector is not the zero vector.
pub fn is_nonzero_vector(vector: &[f64; 3]) -> Result<(), &'static str> {
    let norm_sq: f64 = vector.iter().map(|c| c * c).sum();
    if norm_sq > 0.0 {
        Ok(())
    } else {
        Err("Direction vector cannot be zero")
    }
}

/// Validates that a direction vector has unit length within
/// [`UNIT_VECTOR_TOLERANCE`].
pub fn is_unit_vector(vector: &[f64; 3]) -> Result<(), &'static str> {
    let norm: f64 = vector.iter().map(|c| c * c).sum::<f64>().sqrt();
    if (norm - 1.0).abs() <= UNIT_VECTOR_TOLERANCE {
        Ok(())
    } else {
        Err("Direction vector is not normalised")
    }
}

/// Validates that a scalar is finite.
pub fn is_finite(value: f64) -> Result<(), &'static str> {
    if value.is_finite() {
        Ok(())
    } else {
        Err("Value must be finite")
    }
}

/// Validates if a given string is a valid file path.
///
/// # Arguments
///
/// * `path` - The string to validate.
///
/// # Returns
///
/// * `Ok(())` if the file path is valid.
/// * `Err(&'static str)` if the file path is invalid.
pub fn is_valid_path(path: &str) -> Result<(), &'static str> {
    if path.is_empty() {
        return Err("File path cannot be empty");
    }
    if path.contains('\0') {
        return Err("File path cannot contain null bytes");
    }
    Ok(())
}

/// Validates if a given value is within a specified numeric range.
pub fn is_in_range<T: PartialOrd>(value: T, range: RangeInclusive<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Validates if a given string is not empty.
pub fn is_not_empty(value: &str) -> Result<(), &'static str> {
    if !value.trim().is_empty() {
        Ok(())
    } else {
        Err("Value cannot be empty")
    }
}
