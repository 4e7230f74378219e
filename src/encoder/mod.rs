//! Encoders consume the prepared geometry, scan and layout and materialise them.
//!
//! The core never produces file-format bytes itself. An [`Encoder`] receives
//! chain records (axes with their per-frame positions and resolved
//! `depends_on` paths), the scan point set and the virtual layout plan, and
//! drives its storage backend:
//!
//! - [`ManifestEncoder`]: JSON manifest via `serde_json`, always available.
//! - `Hdf5Encoder`: HDF5 file via the `hdf5` crate (feature `storage_hdf5`).

mod manifest;
#[cfg(feature = "storage_hdf5")]
mod nexus_hdf5;

pub use manifest::{CollectionManifest, ManifestEncoder};
#[cfg(feature = "storage_hdf5")]
pub use nexus_hdf5::Hdf5Encoder;

use crate::error::{AppResult, GeometryError};
use crate::geometry::{GeometryGraph, TransformationType, Vector3};
use crate::scan::ScanPointSet;
use crate::vds::VirtualLayoutPlan;
use serde::{Deserialize, Serialize};

/// Value unbacked logical frames read as.
pub const DEFAULT_FILL_VALUE: i64 = -1;

/// One axis as it is written: geometry, resolved dependency and positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisRecord {
    /// Axis name, also the dataset name.
    pub name: String,
    /// Rotation or translation.
    pub transformation_type: TransformationType,
    /// `deg` or `mm`.
    pub units: String,
    /// Direction in McStas.
    pub vector: Vector3,
    /// Offset in McStas.
    pub offset: Vector3,
    /// Full path of the parent transformation, or `"."`.
    pub depends_on: String,
    /// One value per frame.
    pub positions: Vec<f64>,
}

/// One axis chain as it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRecord {
    /// Chain label, e.g. `goniometer`.
    pub name: String,
    /// Group the transformations are written to.
    pub group: String,
    /// Axes in chain order.
    pub axes: Vec<AxisRecord>,
}

impl ChainRecord {
    /// Flatten a chain and its scan into records.
    ///
    /// `upstream_group` is used for axes depending on a linked upstream chain.
    pub fn from_graph(
        name: &str,
        group: &str,
        upstream_group: Option<&str>,
        graph: &GeometryGraph,
        scan: &ScanPointSet,
    ) -> Result<Self, GeometryError> {
        let positions = scan.expand(graph);
        let axes = graph
            .axes()
            .iter()
            .zip(positions)
            .map(|(axis, (_, positions))| {
                Ok(AxisRecord {
                    name: axis.name.clone(),
                    transformation_type: axis.transformation_type,
                    units: axis.units().to_string(),
                    vector: axis.vector,
                    offset: axis.offset,
                    depends_on: graph.dependency_path(&axis.name, group, upstream_group)?,
                    positions,
                })
            })
            .collect::<Result<Vec<_>, GeometryError>>()?;
        Ok(Self {
            name: name.to_string(),
            group: group.to_string(),
            axes,
        })
    }
}

/// Consumer of the prepared collection.
///
/// Calls arrive in order: every chain, then the scan, then the layout if any,
/// then `finish` exactly once.
pub trait Encoder {
    /// Write one axis chain.
    fn write_chain(&mut self, chain: &ChainRecord) -> AppResult<()>;

    /// Write the per-frame positions of the scanning axes.
    fn write_scan(&mut self, scan: &ScanPointSet) -> AppResult<()>;

    /// Write the logical-to-physical frame mapping.
    fn write_layout(&mut self, layout: &VirtualLayoutPlan, fill_value: i64) -> AppResult<()>;

    /// Finalise the output.
    fn finish(&mut self) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Axis, ROOT};
    use crate::scan::{compute_scan, ScanOptions};

    #[test]
    fn chain_record_resolves_paths_and_positions() {
        let graph = GeometryGraph::build(vec![
            Axis::rotation("omega", [0.0, 0.0, -1.0], ROOT, 0.0).with_scan(1.0, 3),
            Axis::rotation("phi", [0.0, 0.0, -1.0], "omega", 90.0),
        ])
        .unwrap();
        let scan = compute_scan(&graph, &ScanOptions::default()).unwrap();
        let record = ChainRecord::from_graph(
            "goniometer",
            "/entry/sample/transformations",
            None,
            &graph,
            &scan,
        )
        .unwrap();
        assert_eq!(record.axes[0].depends_on, ".");
        assert_eq!(record.axes[0].positions, vec![0.0, 1.0, 2.0]);
        assert_eq!(record.axes[1].depends_on, "/entry/sample/transformations/omega");
        assert_eq!(record.axes[1].positions, vec![90.0; 3]);
        assert_eq!(record.axes[1].units, "deg");
    }
}
