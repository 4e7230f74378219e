//! Axis model for goniometer and detector chains.
//!
//! An [`Axis`] is one mechanical degree of freedom. Axes reference each other
//! through `depends_on`, forming a tree rooted at the lab frame ([`ROOT`]).
//! [`GeometryGraph`] validates that tree and answers chain and scan-axis
//! queries; [`frame`] re-expresses vectors in the McStas frame before the graph
//! is built; [`detector`] derives the detector module origin.

pub mod detector;
pub mod frame;
pub mod graph;

pub use detector::{DetectorModule, OriginMode};
pub use frame::{convert_axes, CoordinateFrame};
pub use graph::{GeometryGraph, ScanAxes};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel `depends_on` value meaning "depends on nothing / lab frame".
pub const ROOT: &str = ".";

/// A 3-component real vector.
pub type Vector3 = [f64; 3];

/// Kind of motion an axis performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformationType {
    /// Rotation about `vector`, in degrees.
    Rotation,
    /// Translation along `vector`, in millimetres.
    Translation,
}

impl TransformationType {
    /// Units of the axis position: degrees for rotations, millimetres for translations.
    pub fn units(&self) -> &'static str {
        match self {
            TransformationType::Rotation => "deg",
            TransformationType::Translation => "mm",
        }
    }
}

impl fmt::Display for TransformationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformationType::Rotation => write!(f, "rotation"),
            TransformationType::Translation => write!(f, "translation"),
        }
    }
}

/// One mechanical degree of freedom of the instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Unique identifier within its chain.
    pub name: String,
    /// Rotation or translation.
    pub transformation_type: TransformationType,
    /// Direction of motion.
    pub vector: Vector3,
    /// Parent axis name, or [`ROOT`].
    pub depends_on: String,
    /// Position at the first frame.
    #[serde(default)]
    pub start: f64,
    /// Per-step delta. Zero means a static axis.
    #[serde(default)]
    pub increment: f64,
    /// Number of scan points. `None` means the axis is not a scan axis.
    #[serde(default)]
    pub num_steps: Option<usize>,
    /// Fixed displacement of the axis origin.
    #[serde(default)]
    pub offset: Vector3,
}

impl Axis {
    /// Create a static axis at `start`.
    pub fn new(
        name: impl Into<String>,
        transformation_type: TransformationType,
        vector: Vector3,
        depends_on: impl Into<String>,
        start: f64,
    ) -> Self {
        Self {
            name: name.into(),
            transformation_type,
            vector,
            depends_on: depends_on.into(),
            start,
            increment: 0.0,
            num_steps: None,
            offset: [0.0; 3],
        }
    }

    /// Shorthand for a rotation axis.
    pub fn rotation(
        name: impl Into<String>,
        vector: Vector3,
        depends_on: impl Into<String>,
        start: f64,
    ) -> Self {
        Self::new(name, TransformationType::Rotation, vector, depends_on, start)
    }

    /// Shorthand for a translation axis.
    pub fn translation(
        name: impl Into<String>,
        vector: Vector3,
        depends_on: impl Into<String>,
        start: f64,
    ) -> Self {
        Self::new(name, TransformationType::Translation, vector, depends_on, start)
    }

    /// Turn the axis into a scan axis.
    pub fn with_scan(mut self, increment: f64, num_steps: usize) -> Self {
        self.increment = increment;
        self.num_steps = Some(num_steps);
        self
    }

    /// Set the axis offset.
    pub fn with_offset(mut self, offset: Vector3) -> Self {
        self.offset = offset;
        self
    }

    /// Whether the axis hangs directly off the lab frame.
    pub fn is_root_child(&self) -> bool {
        self.depends_on == ROOT
    }

    /// Whether the axis declares scan parameters.
    pub fn is_scan(&self) -> bool {
        self.num_steps.is_some()
    }

    /// Units of the axis position.
    pub fn units(&self) -> &'static str {
        self.transformation_type.units()
    }

    /// Last recorded position: `start + increment * (num_steps - 1)` when
    /// scanning, `start` otherwise.
    pub fn end(&self) -> f64 {
        match self.num_steps {
            Some(n) if n > 1 && self.increment != 0.0 => {
                self.start + self.increment * (n - 1) as f64
            }
            _ => self.start,
        }
    }

    /// Position at scan step `i`, computed directly as `start + i * increment`.
    pub fn position_at(&self, i: usize) -> f64 {
        self.start + i as f64 * self.increment
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} => {} on {}",
            self.name,
            self.start,
            self.units(),
            self.transformation_type,
            self.depends_on
        )
    }
}
