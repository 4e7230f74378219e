use crate::geometry::GeometryGraph;
use serde::{Deserialize, Serialize};

/// Ordered per-frame positions of the scanning axes.
///
/// `frames[k][a]` is the position of `axes[a]` at logical frame `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPointSet {
    axes: Vec<String>,
    frames: Vec<Vec<f64>>,
}

impl ScanPointSet {
    pub(crate) fn new(axes: Vec<String>, frames: Vec<Vec<f64>>) -> Self {
        Self { axes, frames }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the set holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Axes recorded per frame, slow first for grids.
    pub fn axes(&self) -> &[String] {
        &self.axes
    }

    /// Positions at frame `k`.
    pub fn frame(&self, k: usize) -> Option<&[f64]> {
        self.frames.get(k).map(Vec::as_slice)
    }

    /// Iterate over frames in order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.frames.iter().map(Vec::as_slice)
    }

    /// All positions of one axis, in frame order.
    pub fn column(&self, axis: &str) -> Option<Vec<f64>> {
        let idx = self.axes.iter().position(|name| name == axis)?;
        Some(self.frames.iter().map(|frame| frame[idx]).collect())
    }

    /// First and last recorded position of an axis.
    pub fn range_of(&self, axis: &str) -> Option<(f64, f64)> {
        let idx = self.axes.iter().position(|name| name == axis)?;
        let first = self.frames.first()?[idx];
        let last = self.frames.last()?[idx];
        Some((first, last))
    }

    /// One full-length position array per axis of the chain, in chain order.
    ///
    /// Axes that do not move repeat their static `start` for every frame.
    pub fn expand(&self, graph: &GeometryGraph) -> Vec<(String, Vec<f64>)> {
        graph
            .axes()
            .iter()
            .map(|axis| {
                let values = self
                    .column(&axis.name)
                    .unwrap_or_else(|| vec![axis.start; self.len()]);
                (axis.name.clone(), values)
            })
            .collect()
    }
}
