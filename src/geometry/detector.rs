//! Detector module orientation and origin.

use super::Vector3;
use serde::{Deserialize, Serialize};

/// Millimetres per metre.
pub const MM_PER_METRE: f64 = 1000.0;

/// How the module offset is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OriginMode {
    /// Un-normalised displacement vector, offset value 1.0.
    #[default]
    Absolute,
    /// Normalised displacement vector, offset value is its in-plane magnitude.
    Normalized,
}

/// Detector module: fast/slow pixel directions, pixel size and beam centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorModule {
    /// Direction of increasing fast-axis pixel index (McStas).
    pub fast_axis: Vector3,
    /// Direction of increasing slow-axis pixel index (McStas).
    pub slow_axis: Vector3,
    /// Pixel size `(fast, slow)` in metres.
    pub pixel_size: [f64; 2],
    /// Beam centre `(fast, slow)` in pixels.
    pub beam_center: [f64; 2],
}

impl DetectorModule {
    /// Displacement of the module origin from the beam centre, and the value
    /// the `module_offset` transformation takes.
    pub fn origin(&self, mode: OriginMode) -> (Vector3, f64) {
        let x_scaled = self.beam_center[0] * self.pixel_size[0];
        let y_scaled = self.beam_center[1] * self.pixel_size[1];
        let mut origin = [0.0; 3];
        for (i, o) in origin.iter_mut().enumerate() {
            let c = -(x_scaled * self.fast_axis[i] + y_scaled * self.slow_axis[i]);
            *o = if c == 0.0 { 0.0 } else { c };
        }
        match mode {
            OriginMode::Absolute => (origin, 1.0),
            OriginMode::Normalized => {
                let magnitude = origin[0].hypot(origin[1]);
                if magnitude == 0.0 {
                    return (origin, 0.0);
                }
                let norm = (origin[0] * origin[0] + origin[1] * origin[1] + origin[2] * origin[2]).sqrt();
                (origin.map(|c| c / norm), magnitude)
            }
        }
    }

    /// [`origin`](Self::origin) in millimetres, the unit of translation axes.
    pub fn origin_mm(&self, mode: OriginMode) -> (Vector3, f64) {
        let scaled = DetectorModule {
            pixel_size: self.pixel_size.map(|p| p * MM_PER_METRE),
            ..self.clone()
        };
        scaled.origin(mode)
    }
}
