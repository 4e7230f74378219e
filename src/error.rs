//! Custom error types for the crate.
//!
//! This module defines the error taxonomy for geometry construction, scan
//! computation and virtual layout planning, plus the application-level
//! `NexgenError` that wraps them. Using the `thiserror` crate, every failure
//! carries the offending axis or source name and the conflicting values so it
//! can be surfaced verbatim to the end user.
//!
//! ## Error Hierarchy
//!
//! - **`GeometryError`**: structural configuration errors raised while building
//!   a [`GeometryGraph`](crate::geometry::GeometryGraph). Always fatal.
//! - **`ScanError`**: scan definition errors raised while identifying scan
//!   axes or computing scan points. No partial scan is ever returned.
//! - **`LayoutError`**: virtual layout errors, fatal for the plan request. The
//!   planner never coerces or corrects source metadata.
//! - **`NexgenError`**: consolidates the above together with configuration,
//!   I/O, serialization and storage failures.
//!
//! None of these errors are retried internally: all inputs are static, so a
//! retry with unchanged input reproduces the identical error.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, NexgenError>;

/// Structural errors in an axis chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// An axis' `depends_on` walk never reaches the root.
    #[error("Cyclic dependency detected starting from axis '{axis}': {}", chain.join(" -> "))]
    CyclicDependency {
        /// Axis where the walk towards the root started.
        axis: String,
        /// Axes visited before the walk was abandoned.
        chain: Vec<String>,
    },

    /// `depends_on` names an axis that is not declared.
    #[error("Axis '{axis}' depends on unknown axis '{depends_on}'")]
    UnknownDependency {
        /// Axis carrying the dangling reference.
        axis: String,
        /// Name that could not be resolved.
        depends_on: String,
    },

    /// Two axes share a name.
    #[error("Duplicate axis name '{0}'")]
    DuplicateAxisName(String),

    /// Lookup of an axis that is not in the chain.
    #[error("Axis '{0}' not found in geometry")]
    AxisNotFound(String),
}

/// Errors raised while identifying scan axes or computing scan points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The requested axis carries no scan parameters.
    #[error("Axis '{axis}' is not a declared scan axis (scan axes: [{}])", declared.join(", "))]
    ScanAxisNotFound {
        /// Requested axis name.
        axis: String,
        /// Axes that actually carry scan parameters.
        declared: Vec<String>,
    },

    /// A scanning axis has unusable parameters.
    #[error("Invalid scan axis '{axis}': {reason}")]
    ScanAxis {
        /// Offending axis name.
        axis: String,
        /// Human readable description of the inconsistency.
        reason: String,
    },

    /// More than two axes carry scan parameters.
    #[error("Found {} scanning axes [{}], at most two are supported", .0.len(), .0.join(", "))]
    MultipleScanAxes(Vec<String>),

    /// Two scanning axes with no dependency between them.
    #[error("Cannot order grid scan axes '{first}' and '{second}': neither depends on the other")]
    AmbiguousGridOrder {
        /// First scanning axis in chain order.
        first: String,
        /// Second scanning axis in chain order.
        second: String,
    },
}

/// Errors raised by the virtual array planner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Two declared logical ranges intersect.
    #[error(
        "Sources '{first}' [{first_start}, {first_end}) and '{second}' [{second_start}, {second_end}) overlap"
    )]
    Overlap {
        /// Source starting first.
        first: String,
        /// Declared start of `first`.
        first_start: usize,
        /// Declared end of `first`, exclusive.
        first_end: usize,
        /// Source starting inside `first`.
        second: String,
        /// Declared start of `second`.
        second_start: usize,
        /// Declared end of `second`, exclusive.
        second_end: usize,
    },

    /// A source's frame shape differs from the first source's.
    #[error("Source '{source_path}' has frame shape {found}, expected {expected}")]
    ShapeMismatch {
        /// Offending source.
        source_path: String,
        /// Shape of the first source.
        expected: String,
        /// Shape of the offending source.
        found: String,
    },

    /// A source's element type differs from the first source's.
    #[error("Source '{source_path}' has dtype {found}, expected {expected}")]
    DtypeMismatch {
        /// Offending source.
        source_path: String,
        /// Element type of the first source.
        expected: String,
        /// Element type of the offending source.
        found: String,
    },

    /// The source list is empty.
    #[error("No data sources supplied to the planner")]
    NoSources,

    /// A data file template or split size is unusable.
    #[error("Invalid data file split: {0}")]
    InvalidSplit(String),
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum NexgenError {
    /// Axis chain construction failed.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Scan axis identification or point computation failed.
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Virtual layout planning failed.
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Configuration could not be loaded or extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration loaded but is semantically invalid.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Encoder misuse or backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// HDF5 library failure.
    #[cfg(feature = "storage_hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Requested backend was not compiled in.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl NexgenError {
    /// Whether correcting the input metadata and re-running could succeed.
    ///
    /// Layout errors are scoped to a single plan request; everything else
    /// aborts the run.
    pub fn is_request_scoped(&self) -> bool {
        matches!(self, NexgenError::Layout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_dependency_message_lists_chain() {
        let err = GeometryError::CyclicDependency {
            axis: "phi".into(),
            chain: vec!["phi".into(), "chi".into(), "phi".into()],
        };
        assert_eq!(
            err.to_string(),
            "Cyclic dependency detected starting from axis 'phi': phi -> chi -> phi"
        );
    }

    #[test]
    fn scan_errors_convert_into_app_error() {
        let err: NexgenError = ScanError::MultipleScanAxes(vec![
            "omega".into(),
            "sam_x".into(),
            "sam_y".into(),
        ])
        .into();
        let msg = err.to_string();
        assert!(msg.contains("Found 3 scanning axes"));
        assert!(msg.contains("omega, sam_x, sam_y"));
        assert!(!err.is_request_scoped());
    }

    #[test]
    fn layout_errors_are_request_scoped() {
        let err: NexgenError = LayoutError::NoSources.into();
        assert!(err.is_request_scoped());
    }

    #[test]
    fn overlap_message_names_both_sources() {
        let err = LayoutError::Overlap {
            first: "a.h5".into(),
            first_start: 0,
            first_end: 100,
            second: "b.h5".into(),
            second_start: 50,
            second_end: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("'a.h5' [0, 100)"));
        assert!(msg.contains("'b.h5' [50, 100)"));
    }
}
