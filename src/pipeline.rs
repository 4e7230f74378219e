//! Collection pipeline: configuration to chains, scan, layout and encoder.
//!
//! ```text
//! NexgenConfig ─► convert frame ─► GeometryGraph (goniometer, detector)
//!                                        │
//!                                        ▼
//!                                  ScanPointSet ─► VirtualLayoutPlan
//!                                        │                 │
//!                                        └──────► Encoder ◄┘
//! ```
//!
//! Every stage is a pure function of the configuration; the encoder is the
//! only place anything is written.

use crate::config::{AxisConfig, NexgenConfig};
use crate::encoder::{ChainRecord, Encoder};
use crate::error::AppResult;
use crate::geometry::{convert_axes, Axis, CoordinateFrame, GeometryGraph, ROOT};
use crate::scan::{compute_scan, compute_scan_for, ScanPointSet};
use crate::vds::{plan, VirtualLayoutPlan};
use tracing::{info, instrument, warn};

/// Group the goniometer transformations are written to.
pub const GONIOMETER_GROUP: &str = "/entry/sample/transformations";
/// Group the detector transformations are written to.
pub const DETECTOR_GROUP: &str = "/entry/instrument/detector/transformations";
/// Name of the axis placing the detector module relative to the detector chain.
pub const MODULE_OFFSET_AXIS: &str = "module_offset";

/// Overrides applied on top of the `data` section, e.g. from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutOverrides {
    /// Replaces `data.logical_offset`.
    pub logical_offset: Option<usize>,
    /// Replaces `data.total_frames`.
    pub total_frames: Option<usize>,
}

/// Everything an encoder needs for one collection.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Sample chain in McStas.
    pub goniometer: GeometryGraph,
    /// Detector chain in McStas, including any `module_offset` axis.
    pub detector: GeometryGraph,
    /// Goniometer positions, one row per frame.
    pub scan: ScanPointSet,
    /// Frame mapping, when a data section is configured.
    pub layout: Option<VirtualLayoutPlan>,
    /// Value unbacked frames read as.
    pub fill_value: i64,
}

fn to_axes(entries: &[AxisConfig], frame: &CoordinateFrame) -> Vec<Axis> {
    let axes: Vec<Axis> = entries.iter().map(AxisConfig::to_axis).collect();
    convert_axes(&axes, frame)
}

/// Build the goniometer chain in the McStas frame.
pub fn build_goniometer(config: &NexgenConfig) -> AppResult<GeometryGraph> {
    let frame = config.coordinate_frame()?;
    Ok(GeometryGraph::build(to_axes(&config.goniometer.axes, &frame))?)
}

/// Build the detector chain in the McStas frame.
///
/// A configured module adds a `module_offset` translation depending on the
/// last detector axis. Pixel sizes are in metres; the offset is written in
/// millimetres like every other translation.
pub fn build_detector(config: &NexgenConfig) -> AppResult<GeometryGraph> {
    let frame = config.coordinate_frame()?;
    let mut axes = to_axes(&config.detector.axes, &frame);
    if let Some(module) = &config.detector.module {
        let mut module = module.clone();
        module.fast_axis = frame.to_mcstas(module.fast_axis);
        module.slow_axis = frame.to_mcstas(module.slow_axis);
        let (vector, value) = module.origin_mm(config.detector.origin_mode);
        let parent = axes.last().map_or_else(|| ROOT.to_string(), |ax| ax.name.clone());
        axes.push(Axis::translation(MODULE_OFFSET_AXIS, vector, parent, value));
    }
    Ok(GeometryGraph::build(axes)?)
}

/// Compute the goniometer scan, checking `scan_axis` when one is configured.
pub fn compute_collection_scan(
    config: &NexgenConfig,
    goniometer: &GeometryGraph,
) -> AppResult<ScanPointSet> {
    let options = config.goniometer.scan_options();
    let scan = match &config.goniometer.scan_axis {
        Some(axis) => compute_scan_for(goniometer, axis, &options)?,
        None => compute_scan(goniometer, &options)?,
    };
    Ok(scan)
}

/// Plan the logical frame array described by the `data` section.
///
/// Returns `None` when no data section is configured. The logical array
/// defaults to one frame per scan point after the first `logical_offset`.
pub fn plan_layout(
    config: &NexgenConfig,
    scan_frames: usize,
    overrides: LayoutOverrides,
) -> AppResult<Option<VirtualLayoutPlan>> {
    let Some(data) = &config.data else {
        return Ok(None);
    };
    let logical_offset = overrides.logical_offset.unwrap_or(data.logical_offset);
    let total_frames = overrides
        .total_frames
        .or(data.total_frames)
        .unwrap_or_else(|| scan_frames.saturating_sub(logical_offset));
    let sources = data.source_specs(scan_frames)?;
    let layout = plan(&sources, total_frames, logical_offset)?;

    let unused = layout.unused_sources();
    if !unused.is_empty() {
        warn!(
            sources = ?unused.iter().map(|src| src.path.as_str()).collect::<Vec<_>>(),
            "Sources back no logical frame and will not be linked"
        );
    }
    Ok(Some(layout))
}

/// Run every stage for `config`.
pub fn prepare(config: &NexgenConfig) -> AppResult<Collection> {
    prepare_with(config, LayoutOverrides::default())
}

/// Run every stage for `config` with layout overrides.
#[instrument(skip_all, fields(name = %config.application.name))]
pub fn prepare_with(config: &NexgenConfig, overrides: LayoutOverrides) -> AppResult<Collection> {
    config.validate()?;
    let goniometer = build_goniometer(config)?;
    let detector = build_detector(config)?;
    let scan = compute_collection_scan(config, &goniometer)?;
    info!(axes = ?scan.axes(), frames = scan.len(), "Scan computed");

    let layout = plan_layout(config, scan.len(), overrides)?;
    if let Some(layout) = &layout {
        info!(
            shape = ?layout.shape(),
            segments = layout.segments().len(),
            fully_backed = layout.is_fully_backed(),
            "Virtual layout planned"
        );
        let expected = scan.len().saturating_sub(layout.logical_offset());
        if layout.total_frames() != expected {
            warn!(
                total_frames = layout.total_frames(),
                scan_frames = scan.len(),
                logical_offset = layout.logical_offset(),
                "Logical array length differs from the number of scan points"
            );
        }
    }

    Ok(Collection {
        goniometer,
        detector,
        scan,
        layout,
        fill_value: config.output.fill_value,
    })
}

/// Hand a prepared collection to an encoder and finish it.
pub fn encode(collection: &Collection, encoder: &mut dyn Encoder) -> AppResult<()> {
    let gonio = ChainRecord::from_graph(
        "goniometer",
        GONIOMETER_GROUP,
        None,
        &collection.goniometer,
        &collection.scan,
    )?;
    // Detector axes do not move with the goniometer: repeat their starts.
    let detector_frames = ScanPointSet::new(Vec::new(), vec![Vec::new(); collection.scan.len()]);
    let detector = ChainRecord::from_graph(
        "detector",
        DETECTOR_GROUP,
        None,
        &collection.detector,
        &detector_frames,
    )?;

    encoder.write_chain(&gonio)?;
    encoder.write_chain(&detector)?;
    encoder.write_scan(&collection.scan)?;
    if let Some(layout) = &collection.layout {
        encoder.write_layout(layout, collection.fill_value)?;
    }
    encoder.finish()
}
