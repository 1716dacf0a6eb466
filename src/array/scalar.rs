use super::{permute_points, FieldError};
use crate::prelude::*;

#[derive(Deref, Into, Clone, PartialEq, Default, Debug)]
/// Scalar point data (such as density) in the vtk point layout: X varies fastest.
///
/// Values are only ever constructed through [`ScalarField::from_declared`], so the length
/// always matches the number of points of the grid it was built against.
pub struct ScalarField(Vec<f64>);

impl ScalarField {
    /// Reorder a flat field given in the grid's declared axis order into the vtk layout.
    ///
    /// Fails with `FieldSizeMismatch` when `values` does not hold exactly one value per grid
    /// point. Nothing is truncated or padded.
    pub fn from_declared(name: &str, values: Vec<f64>, grid: &GridSpec) -> Result<Self, FieldError> {
        let expected = grid.num_points();
        let actual = values.len();

        if actual != expected {
            return Err(FieldError::size_mismatch(name, expected, actual));
        }

        let values = permute_points(values, grid.dimensions(), grid.permutation())
            .map_err(|_| FieldError::size_mismatch(name, expected, actual))?;

        Ok(Self(values))
    }

    /// The values back in the grid's declared axis order. Fails only when `grid` is not
    /// the grid this field was built against.
    pub fn to_declared(&self, grid: &GridSpec) -> Result<Vec<f64>, ndarray::ShapeError> {
        let permutation = grid.permutation();
        permute_points(self.0.clone(), grid.target_shape(), permutation.inverse())
    }

    /// get the values this type wraps.
    pub fn inner(self) -> Vec<f64> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AxisOrder, RawGridInfo};

    fn grid(dimensions: [f64; 3], order: AxisOrder) -> GridSpec {
        let raw = RawGridInfo {
            dimensions: Some(dimensions.to_vec()),
            voxel_size: Some(vec![0.1, 0.1, 0.1]),
            origin: Some(vec![0.0, 0.0, 0.0]),
        };
        GridSpec::from_raw(&raw, order).unwrap()
    }

    #[test]
    fn line_grid_is_a_no_op() {
        let grid = grid([3.0, 1.0, 1.0], AxisOrder::ZYX);
        let field =
            ScalarField::from_declared("density", vec![1025.17, 1024.99, 1024.84], &grid).unwrap();

        assert_eq!(field.as_slice(), &[1025.17, 1024.99, 1024.84]);
        assert_eq!(grid.target_dimensions(), [1, 1, 3]);
    }

    #[test]
    fn size_mismatch_produces_nothing() {
        let grid = grid([3.0, 1.0, 1.0], AxisOrder::ZYX);

        for values in [vec![1.0, 2.0], vec![1.0, 2.0, 3.0, 4.0], vec![]] {
            let actual = values.len();
            let err = ScalarField::from_declared("temperature", values, &grid).unwrap_err();
            assert_eq!(err, FieldError::size_mismatch("temperature", 3, actual));
        }
    }

    #[test]
    fn xyz_field_is_transposed() {
        // declared (x, y, z) with nx = 2, ny = 1, nz = 2; value = 10 * x + z
        let grid = grid([2.0, 1.0, 2.0], AxisOrder::XYZ);
        let declared = vec![0.0, 1.0, 10.0, 11.0];

        let field = ScalarField::from_declared("p", declared.clone(), &grid).unwrap();

        // vtk order walks x fastest
        assert_eq!(field.as_slice(), &[0.0, 10.0, 1.0, 11.0]);
        assert_eq!(field.to_declared(&grid).unwrap(), declared);
    }
}
