//! Coordinate frame conversion to the NeXus McStas frame.
//!
//! Conversion happens before a [`GeometryGraph`](super::GeometryGraph) is
//! built: the graph only ever sees McStas vectors.

use super::{Axis, Vector3};
use serde::{Deserialize, Serialize};

/// 3x3 row-major transformation matrix.
pub type Matrix3 = [[f64; 3]; 3];

const IMGCIF_TO_MCSTAS: Matrix3 = [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]];

/// Convention the input vectors are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateFrame {
    /// Already McStas, nothing to do.
    #[default]
    McStas,
    /// imgCIF / CBF convention.
    ImgCif,
    /// Arbitrary frame given by its transformation matrix to McStas.
    Custom(Matrix3),
}

impl CoordinateFrame {
    /// Matrix mapping vectors in this frame to McStas.
    pub fn to_mcstas_matrix(&self) -> Option<Matrix3> {
        match self {
            CoordinateFrame::McStas => None,
            CoordinateFrame::ImgCif => Some(IMGCIF_TO_MCSTAS),
            CoordinateFrame::Custom(mat) => Some(*mat),
        }
    }

    /// Re-express a single vector in McStas.
    pub fn to_mcstas(&self, vector: Vector3) -> Vector3 {
        match self.to_mcstas_matrix() {
            Some(mat) => apply(&mat, vector),
            None => vector,
        }
    }
}

/// Build the matrix from the basis vectors of a custom frame.
///
/// Each basis vector is expressed in McStas and becomes a column of the result.
pub fn matrix_from_basis(x: Vector3, y: Vector3, z: Vector3) -> Matrix3 {
    [[x[0], y[0], z[0]], [x[1], y[1], z[1]], [x[2], y[2], z[2]]]
}

fn apply(mat: &Matrix3, v: Vector3) -> Vector3 {
    let mut out = [0.0; 3];
    for (row, o) in mat.iter().zip(out.iter_mut()) {
        *o = row[0] * v[0] + row[1] * v[1] + row[2] * v[2];
    }
    // Avoid -0.0 leaking into written vectors.
    out.map(|c| if c == 0.0 { 0.0 } else { c })
}

/// Return a new chain with vectors and offsets re-expressed in McStas.
pub fn convert_axes(axes: &[Axis], frame: &CoordinateFrame) -> Vec<Axis> {
    axes.iter()
        .map(|axis| Axis {
            vector: frame.to_mcstas(axis.vector),
            offset: frame.to_mcstas(axis.offset),
            ..axis.clone()
        })
        .collect()
}
