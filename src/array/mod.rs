//! container types for field data and the axis reordering between layouts
//!
//! Every field that leaves the simulation layout goes through [`permute_points`]. It
//! reinterprets a flat list of per-point values as a 3D array in one axis order, permutes
//! the axes, and flattens it again row-major. The per-point payload (a scalar, or the three
//! components of a vector) is moved as a unit and never reordered itself.

mod scalar;
mod vector;

pub use scalar::ScalarField;
pub use vector::VectorField;

use crate::grid::Permutation;
use crate::traits::{Array, Numeric};
use crate::write_vtk::Precision;
use ndarray::Array3;

/// Reorder the points of a field with shape `shape` (slowest axis first) by `permutation`.
///
/// The output has shape `permutation.apply(shape)`, flattened row-major. Applying the
/// inverse permutation to that shape gives back the original sequence.
pub fn permute_points<T: Clone>(
    points: Vec<T>,
    shape: [usize; 3],
    permutation: Permutation,
) -> Result<Vec<T>, ndarray::ShapeError> {
    let arr = Array3::from_shape_vec((shape[0], shape[1], shape[2]), points)?;

    if permutation.is_identity() {
        return Ok(arr.into_raw_vec());
    }

    let axes = permutation.axes();
    let permuted = arr.permuted_axes((axes[0], axes[1], axes[2]));

    // `iter` walks in logical (row-major) order regardless of the strides
    Ok(permuted.iter().cloned().collect())
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("field `{field_name}` has {actual} points, the grid has {expected}")]
    FieldSizeMismatch {
        field_name: String,
        expected: usize,
        actual: usize,
    },
    #[error("point {point} of vector field `{field_name}` has {components} components, expected 3")]
    MalformedVector {
        field_name: String,
        point: usize,
        components: usize,
    },
    #[error("field `{field_name}` is not a list of numbers or a list of 3-vectors")]
    MalformedField { field_name: String },
}

impl FieldError {
    pub fn size_mismatch<T: Into<String>>(field_name: T, expected: usize, actual: usize) -> Self {
        Self::FieldSizeMismatch {
            field_name: field_name.into(),
            expected,
            actual,
        }
    }

    /// name of the field that failed validation
    pub fn field_name(&self) -> &str {
        match self {
            Self::FieldSizeMismatch { field_name, .. }
            | Self::MalformedVector { field_name, .. }
            | Self::MalformedField { field_name } => field_name,
        }
    }
}

impl<NUM> Array for [NUM]
where
    NUM: Numeric,
{
    fn precision(&self) -> Precision {
        NUM::PRECISION
    }

    fn length(&self) -> usize {
        self.len()
    }

    fn extend_le_bytes(&self, bytes: &mut Vec<u8>) {
        bytes.reserve(self.len() * NUM::PRECISION.size());
        for value in self {
            bytes.extend_from_slice(value.to_le_bytes().as_ref());
        }
    }

    fn push_ascii(&self, out: &mut String) {
        for (idx, value) in self.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            value.push_ascii(out);
        }
    }
}

impl<NUM> Array for [[NUM; 3]]
where
    NUM: Numeric,
{
    fn precision(&self) -> Precision {
        NUM::PRECISION
    }

    fn components(&self) -> usize {
        3
    }

    fn length(&self) -> usize {
        self.len()
    }

    fn extend_le_bytes(&self, bytes: &mut Vec<u8>) {
        bytes.reserve(self.len() * 3 * NUM::PRECISION.size());
        for point in self {
            for value in point {
                bytes.extend_from_slice(value.to_le_bytes().as_ref());
            }
        }
    }

    fn push_ascii(&self, out: &mut String) {
        for (idx, value) in self.iter().flatten().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            value.push_ascii(out);
        }
    }
}
