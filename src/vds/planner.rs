use super::{DataType, FrameShape, VirtualSourceSpec};
use crate::error::LayoutError;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, warn};

/// One contiguous span of the logical array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayoutSegment {
    /// Frames read from a physical source.
    Backed {
        /// Logical frames covered.
        logical: Range<usize>,
        /// Index into [`VirtualLayoutPlan::sources`].
        source: usize,
        /// Frames of the source mapped onto `logical`.
        local: Range<usize>,
    },
    /// Frames no source covers; the encoder fills them.
    Unbacked {
        /// Logical frames covered.
        logical: Range<usize>,
    },
}

impl LayoutSegment {
    /// Logical frames covered by the segment.
    pub fn logical(&self) -> &Range<usize> {
        match self {
            LayoutSegment::Backed { logical, .. } | LayoutSegment::Unbacked { logical } => logical,
        }
    }

    /// Whether a source backs the segment.
    pub fn is_backed(&self) -> bool {
        matches!(self, LayoutSegment::Backed { .. })
    }
}

/// Mapping from logical frame ranges to physical sources.
///
/// Segments are ordered, contiguous and cover `[0, total_frames)` exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualLayoutPlan {
    total_frames: usize,
    logical_offset: usize,
    frame_shape: FrameShape,
    dtype: DataType,
    sources: Vec<VirtualSourceSpec>,
    segments: Vec<LayoutSegment>,
}

impl VirtualLayoutPlan {
    /// Length of the logical array.
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Offset the plan was built with.
    pub fn logical_offset(&self) -> usize {
        self.logical_offset
    }

    /// Frame extent shared by all sources.
    pub fn frame_shape(&self) -> FrameShape {
        self.frame_shape
    }

    /// Element type shared by all sources.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Full shape of the logical array: `(frames, rows, cols)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.total_frames, self.frame_shape.rows, self.frame_shape.cols)
    }

    /// Sources sorted by starting logical index.
    pub fn sources(&self) -> &[VirtualSourceSpec] {
        &self.sources
    }

    /// Ordered segments covering the logical array.
    pub fn segments(&self) -> &[LayoutSegment] {
        &self.segments
    }

    /// Logical ranges not backed by any source.
    pub fn unbacked_ranges(&self) -> Vec<Range<usize>> {
        self.segments
            .iter()
            .filter_map(|seg| match seg {
                LayoutSegment::Unbacked { logical } => Some(logical.clone()),
                LayoutSegment::Backed { .. } => None,
            })
            .collect()
    }

    /// Whether every logical frame is backed.
    pub fn is_fully_backed(&self) -> bool {
        self.segments.iter().all(LayoutSegment::is_backed)
    }

    /// Sources that back no logical frame once offset and clipping apply.
    pub fn unused_sources(&self) -> Vec<&VirtualSourceSpec> {
        self.sources
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                !self
                    .segments
                    .iter()
                    .any(|seg| matches!(seg, LayoutSegment::Backed { source, .. } if source == idx))
            })
            .map(|(_, src)| src)
            .collect()
    }

    /// Physical location of a logical frame, `None` if unbacked or out of range.
    pub fn locate(&self, logical_index: usize) -> Option<(&VirtualSourceSpec, usize)> {
        let pos = self
            .segments
            .partition_point(|seg| seg.logical().end <= logical_index);
        match self.segments.get(pos)? {
            LayoutSegment::Backed {
                logical,
                source,
                local,
            } if logical.contains(&logical_index) => {
                Some((&self.sources[*source], local.start + (logical_index - logical.start)))
            }
            _ => None,
        }
    }
}

/// Plan a logical array of `total_frames` frames over `sources`.
///
/// Every source's effective start is `starting_logical_index - logical_offset`,
/// so logical frame 0 can correspond to any physical frame. Source frames that
/// land before 0 or at/after `total_frames` are clipped; uncovered logical
/// frames are recorded as [`LayoutSegment::Unbacked`].
///
/// Fails with [`LayoutError::Overlap`] if two declared ranges intersect,
/// [`LayoutError::ShapeMismatch`] / [`LayoutError::DtypeMismatch`] if sources
/// disagree, and [`LayoutError::NoSources`] on an empty list.
pub fn plan(
    sources: &[VirtualSourceSpec],
    total_frames: usize,
    logical_offset: usize,
) -> Result<VirtualLayoutPlan, LayoutError> {
    let mut sources = sources.to_vec();
    sources.sort_by_key(|src| src.starting_logical_index);

    let reference = sources.first().ok_or(LayoutError::NoSources)?;
    let frame_shape = reference.frame_shape;
    let dtype = reference.dtype;
    for src in &sources[1..] {
        if src.frame_shape != frame_shape {
            return Err(LayoutError::ShapeMismatch {
                source_path: src.path.clone(),
                expected: frame_shape.to_string(),
                found: src.frame_shape.to_string(),
            });
        }
        if src.dtype != dtype {
            return Err(LayoutError::DtypeMismatch {
                source_path: src.path.clone(),
                expected: dtype.to_string(),
                found: src.dtype.to_string(),
            });
        }
    }

    let mut previous: Option<&VirtualSourceSpec> = None;
    for src in sources.iter().filter(|src| src.frame_count > 0) {
        if let Some(prev) = previous {
            if prev.logical_range().end > src.starting_logical_index {
                let (a, b) = (prev.logical_range(), src.logical_range());
                return Err(LayoutError::Overlap {
                    first: prev.path.clone(),
                    first_start: a.start,
                    first_end: a.end,
                    second: src.path.clone(),
                    second_start: b.start,
                    second_end: b.end,
                });
            }
        }
        previous = Some(src);
    }

    let mut segments = Vec::with_capacity(sources.len() + 1);
    let mut cursor = 0usize;
    for (idx, src) in sources.iter().enumerate() {
        // Work in i128 so shifted starts may go negative.
        let effective = src.starting_logical_index as i128 - logical_offset as i128;
        let lo = effective.max(0);
        let hi = (effective + src.frame_count as i128).min(total_frames as i128);
        if lo >= hi {
            debug!(source = %src.path, "Source backs no logical frame");
            continue;
        }
        let (lo, hi) = (lo as usize, hi as usize);
        let local_start = (lo as i128 - effective) as usize;

        if lo > cursor {
            segments.push(LayoutSegment::Unbacked { logical: cursor..lo });
        }
        segments.push(LayoutSegment::Backed {
            logical: lo..hi,
            source: idx,
            local: local_start..local_start + (hi - lo),
        });
        cursor = hi;
    }
    if cursor < total_frames {
        segments.push(LayoutSegment::Unbacked {
            logical: cursor..total_frames,
        });
    }

    let plan = VirtualLayoutPlan {
        total_frames,
        logical_offset,
        frame_shape,
        dtype,
        sources,
        segments,
    };
    let unbacked = plan.unbacked_ranges();
    if !unbacked.is_empty() {
        warn!(ranges = ?unbacked, "Logical frames not backed by any source, they will read as fill value");
    }
    debug!(
        total_frames,
        logical_offset,
        segments = plan.segments.len(),
        "Virtual layout planned"
    );
    Ok(plan)
}
