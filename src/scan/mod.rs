//! Scan geometry engine.
//!
//! Computes the ordered per-frame positions of the scanning axes of a
//! [`GeometryGraph`]. Supported patterns are a single-axis scan and a 2D grid
//! scan with an outer (slow) and inner (fast) axis, either raster or snaked.
//!
//! Every position is computed directly as `start + i * increment` from the
//! frame index, never by accumulating increments, so output is exact and
//! deterministic.
//!
//! # Example
//!
//! ```
//! use nexgen::geometry::{Axis, GeometryGraph, ROOT};
//! use nexgen::scan::{compute_scan, ScanOptions};
//!
//! let graph = GeometryGraph::build(vec![
//!     Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 0.0).with_scan(0.5, 4),
//! ])?;
//! let points = compute_scan(&graph, &ScanOptions::default())?;
//! assert_eq!(points.column("omega").unwrap(), vec![0.0, 0.5, 1.0, 1.5]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod points;

pub use points::ScanPointSet;

use crate::error::ScanError;
use crate::geometry::{Axis, GeometryGraph, ScanAxes};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Direction the scanning axes move in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanDirection {
    /// Increments as configured.
    #[default]
    Positive,
    /// Increments negated, e.g. a reverse rotation.
    Negative,
}

impl ScanDirection {
    /// Multiplier applied to the increments.
    pub fn sign(&self) -> f64 {
        match self {
            ScanDirection::Positive => 1.0,
            ScanDirection::Negative => -1.0,
        }
    }
}

/// Options that are not carried by the axes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScanOptions {
    /// Reverse the fast axis on odd rows of a grid scan.
    #[serde(default)]
    pub snaked: bool,
    /// Sign applied to the increments of the scanning axes.
    #[serde(default)]
    pub direction: ScanDirection,
}

impl ScanOptions {
    /// Options for a snaked grid.
    pub fn snaked() -> Self {
        Self {
            snaked: true,
            ..Default::default()
        }
    }
}

/// The shape of the scan, made explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanSpec {
    /// Nothing moves, static positions of the listed axes.
    NoScan(Vec<Axis>),
    /// One axis moves.
    SingleAxisScan(Axis),
    /// Two nested axes move.
    GridScan {
        /// Outer axis.
        slow: Axis,
        /// Inner axis.
        fast: Axis,
        /// Whether the inner axis alternates direction on odd rows.
        snaked: bool,
    },
}

impl ScanSpec {
    /// Derive the scan from the chain's declared scan axes.
    pub fn from_graph(graph: &GeometryGraph, options: &ScanOptions) -> Result<Self, ScanError> {
        let directed = |axis: &Axis| Axis {
            increment: axis.increment * options.direction.sign(),
            ..axis.clone()
        };
        let spec = match graph.scan_axis()? {
            ScanAxes::None => ScanSpec::NoScan(graph.axes().to_vec()),
            ScanAxes::Single(axis) => ScanSpec::SingleAxisScan(directed(axis)),
            ScanAxes::Grid { slow, fast } => ScanSpec::GridScan {
                slow: directed(slow),
                fast: directed(fast),
                snaked: options.snaked,
            },
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), ScanError> {
        let check = |axis: &Axis| -> Result<usize, ScanError> {
            let fail = |reason: String| ScanError::ScanAxis {
                axis: axis.name.clone(),
                reason,
            };
            let steps = axis
                .num_steps
                .ok_or_else(|| fail("num_steps is not set".to_string()))?;
            if steps == 0 {
                return Err(fail(format!("num_steps must be positive, got {}", steps)));
            }
            if !axis.start.is_finite() || !axis.increment.is_finite() {
                return Err(fail(format!(
                    "start ({}) and increment ({}) must be finite",
                    axis.start, axis.increment
                )));
            }
            if steps > 1 && axis.increment == 0.0 {
                warn!(axis = %axis.name, num_steps = steps, "Scan axis has zero increment, all positions equal start");
            }
            Ok(steps)
        };

        match self {
            ScanSpec::NoScan(_) => Ok(()),
            ScanSpec::SingleAxisScan(axis) => check(axis).map(|_| ()),
            ScanSpec::GridScan { slow, fast, .. } => {
                let n_s = check(slow)?;
                let n_f = check(fast)?;
                n_s.checked_mul(n_f).map(|_| ()).ok_or_else(|| ScanError::ScanAxis {
                    axis: fast.name.clone(),
                    reason: format!("grid of {} x {} points overflows", n_s, n_f),
                })
            }
        }
    }

    /// Names of the axes recorded per frame.
    pub fn axis_names(&self) -> Vec<String> {
        match self {
            ScanSpec::NoScan(axes) => axes.iter().map(|ax| ax.name.clone()).collect(),
            ScanSpec::SingleAxisScan(axis) => vec![axis.name.clone()],
            ScanSpec::GridScan { slow, fast, .. } => vec![slow.name.clone(), fast.name.clone()],
        }
    }

    /// Number of frames the scan produces.
    pub fn num_points(&self) -> usize {
        match self {
            ScanSpec::NoScan(_) => 1,
            ScanSpec::SingleAxisScan(axis) => axis.num_steps.unwrap_or(1),
            ScanSpec::GridScan { slow, fast, .. } => {
                slow.num_steps.unwrap_or(1) * fast.num_steps.unwrap_or(1)
            }
        }
    }

    /// Positions at frame `k`, one per entry of [`ScanSpec::axis_names`].
    pub fn point_at(&self, k: usize) -> Vec<f64> {
        match self {
            ScanSpec::NoScan(axes) => axes.iter().map(|ax| ax.start).collect(),
            ScanSpec::SingleAxisScan(axis) => vec![axis.position_at(k)],
            ScanSpec::GridScan { slow, fast, snaked } => {
                let n_f = fast.num_steps.unwrap_or(1);
                let row = k / n_f;
                let col = k % n_f;
                let j = if *snaked && row % 2 == 1 { n_f - 1 - col } else { col };
                vec![slow.position_at(row), fast.position_at(j)]
            }
        }
    }
}

/// Compute the per-frame positions of the chain's scanning axes.
///
/// With no scan axis the result has a single frame holding every axis'
/// static `start`.
pub fn compute_scan(graph: &GeometryGraph, options: &ScanOptions) -> Result<ScanPointSet, ScanError> {
    let spec = ScanSpec::from_graph(graph, options)?;
    let n = spec.num_points();
    let frames: Vec<Vec<f64>> = (0..n).map(|k| spec.point_at(k)).collect();
    debug!(axes = ?spec.axis_names(), frames = n, "Scan points computed");
    Ok(ScanPointSet::new(spec.axis_names(), frames))
}

/// Like [`compute_scan`], but first checks that `axis` is one of the declared
/// scan axes.
pub fn compute_scan_for(
    graph: &GeometryGraph,
    axis: &str,
    options: &ScanOptions,
) -> Result<ScanPointSet, ScanError> {
    let declared = graph.scan_axis()?.names();
    if !declared.iter().any(|name| name == axis) {
        return Err(ScanError::ScanAxisNotFound {
            axis: axis.to_string(),
            declared,
        });
    }
    compute_scan(graph, options)
}
