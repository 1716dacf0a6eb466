use super::{permute_points, FieldError};
use crate::grid::Axis;
use crate::prelude::*;

#[derive(Deref, Into, Clone, PartialEq, Default, Debug)]
/// Vector point data (such as velocity) in the vtk point layout.
///
/// Only the order of the points follows the grid permutation. The three components of
/// every point are kept exactly as they were given.
pub struct VectorField(Vec<[f64; 3]>);

impl VectorField {
    /// Validate a list of per point vectors given in the grid's declared axis order and
    /// reorder the points into the vtk layout.
    ///
    /// The point count is checked first (`FieldSizeMismatch`), then every point must have
    /// exactly three components (`MalformedVector`).
    pub fn from_declared(
        name: &str,
        points: Vec<Vec<f64>>,
        grid: &GridSpec,
    ) -> Result<Self, FieldError> {
        let expected = grid.num_points();

        if points.len() != expected {
            return Err(FieldError::size_mismatch(name, expected, points.len()));
        }

        let points = points
            .into_iter()
            .enumerate()
            .map(|(point, v)| match v.as_slice() {
                [x, y, z] => Ok([*x, *y, *z]),
                _ => Err(FieldError::MalformedVector {
                    field_name: name.to_string(),
                    point,
                    components: v.len(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_points(name, points, grid)
    }

    /// same as [`VectorField::from_declared`] for points that are already 3-tuples
    pub fn from_points(name: &str, points: Vec<[f64; 3]>, grid: &GridSpec) -> Result<Self, FieldError> {
        let expected = grid.num_points();
        let actual = points.len();

        if actual != expected {
            return Err(FieldError::size_mismatch(name, expected, actual));
        }

        let points = permute_points(points, grid.dimensions(), grid.permutation())
            .map_err(|_| FieldError::size_mismatch(name, expected, actual))?;

        Ok(Self(points))
    }

    /// The points back in the grid's declared axis order
    pub fn to_declared(&self, grid: &GridSpec) -> Result<Vec<[f64; 3]>, ndarray::ShapeError> {
        let permutation = grid.permutation();
        permute_points(self.0.clone(), grid.target_shape(), permutation.inverse())
    }

    /// A single component of every point, for consumers that only take scalar channels
    pub fn component(&self, axis: Axis) -> Vec<f64> {
        let idx = axis.index();
        self.0.iter().map(|point| point[idx]).collect()
    }

    /// get the points this type wraps.
    pub fn inner(self) -> Vec<[f64; 3]> {
        self.0
    }
}
