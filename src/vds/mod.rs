//! Virtual array planning.
//!
//! Maps one or more physically separate frame sources onto a single logical
//! frame index space. The planner is a pure metadata computation over shapes
//! and offsets: it never opens a source, so re-planning with a different
//! offset is cheap.
//!
//! ```text
//! logical:  [0 ............ 100)[100 ...... 150)[150 .... 200)
//!              file_000001.h5     file_000002.h5    unbacked
//! ```

mod planner;
mod split;

pub use planner::{plan, LayoutSegment, VirtualLayoutPlan};
pub use split::{split_sources, DataFileTemplate, MAX_FRAMES_PER_DATASET};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Element type of the frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Unsigned 8-bit.
    U8,
    /// Unsigned 16-bit.
    U16,
    /// Unsigned 32-bit.
    U32,
    /// Signed 8-bit.
    I8,
    /// Signed 16-bit.
    I16,
    /// Signed 32-bit.
    I32,
    /// 32-bit float.
    F32,
}

impl DataType {
    /// Dtype for a detector reporting `bits` per pixel.
    ///
    /// 8 and 32 map to the matching unsigned type; anything else is read as 16 bit.
    pub fn from_bit_depth(bits: u32) -> Self {
        match bits {
            8 => DataType::U8,
            32 => DataType::U32,
            _ => DataType::U16,
        }
    }

    /// Width of one element in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::U8 => "uint8",
            DataType::U16 => "uint16",
            DataType::U32 => "uint32",
            DataType::I8 => "int8",
            DataType::I16 => "int16",
            DataType::I32 => "int32",
            DataType::F32 => "float32",
        };
        write!(f, "{}", name)
    }
}

/// Per-frame 2D extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameShape {
    /// Slow-axis pixel count.
    pub rows: usize,
    /// Fast-axis pixel count.
    pub cols: usize,
}

impl FrameShape {
    /// Shape of `rows` by `cols` pixels.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.cols)
    }
}

/// One physical data source as declared by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualSourceSpec {
    /// Opaque handle, typically a file path.
    pub path: String,
    /// Number of frames held by the source.
    pub frame_count: usize,
    /// Extent of each frame.
    pub frame_shape: FrameShape,
    /// Element type.
    pub dtype: DataType,
    /// Logical index where the source's first frame lands, before any offset.
    #[serde(default)]
    pub starting_logical_index: usize,
}

impl VirtualSourceSpec {
    /// Source holding `frame_count` frames, the first at `starting_logical_index`.
    pub fn new(
        path: impl Into<String>,
        frame_count: usize,
        frame_shape: FrameShape,
        dtype: DataType,
        starting_logical_index: usize,
    ) -> Self {
        Self {
            path: path.into(),
            frame_count,
            frame_shape,
            dtype,
            starting_logical_index,
        }
    }

    /// Declared logical range, before any offset.
    pub fn logical_range(&self) -> Range<usize> {
        self.starting_logical_index..self.starting_logical_index.saturating_add(self.frame_count)
    }
}
