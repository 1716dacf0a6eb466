//! # Grid Information
//!
//! A simulation describes its structured grid with three triples (`dimensions`,
//! `voxel_size` and `origin`) listed in its own axis order. By convention that order is
//! slowest varying axis first (`Z, Y, X`), with the field values flattened so that the last
//! declared dimension varies fastest.
//!
//! VTK `ImageData` wants point data with X varying fastest and its extents, origin and
//! spacing given as X, Y, Z. A [`GridSpec`] holds the declared description and knows the
//! [`Permutation`] that carries a flattened field from the declared layout into that target
//! layout. The permutation itself is applied in [`permute_points`](crate::permute_points).

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A physical axis of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// position of this axis in an X, Y, Z ordered triple
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'x' => Some(Self::X),
            'y' => Some(Self::Y),
            'z' => Some(Self::Z),
            _ => None,
        }
    }
}

/// The physical axis carried by each declared dimension, slowest varying first.
///
/// `AxisOrder::ZYX` is the layout of both the simulation output and of VTK point data:
/// the last entry (X) varies fastest when the grid is flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct AxisOrder([Axis; 3]);

impl AxisOrder {
    pub const ZYX: AxisOrder = AxisOrder([Axis::Z, Axis::Y, Axis::X]);
    pub const XYZ: AxisOrder = AxisOrder([Axis::X, Axis::Y, Axis::Z]);

    /// the point ordering of a vtk structured dataset: X fastest, then Y, then Z
    pub const VTK: AxisOrder = AxisOrder::ZYX;

    pub fn new(axes: [Axis; 3]) -> Result<Self, GridError> {
        let distinct = axes[0] != axes[1] && axes[1] != axes[2] && axes[0] != axes[2];

        if distinct {
            Ok(Self(axes))
        } else {
            let name: String = axes.iter().map(|a| a.suffix()).collect();
            Err(GridError::InvalidAxisOrder(name))
        }
    }

    pub fn axes(&self) -> [Axis; 3] {
        self.0
    }

    /// which declared dimension carries `axis`
    pub fn position(&self, axis: Axis) -> usize {
        // every axis appears exactly once, guaranteed by the constructor
        self.0.iter().position(|a| *a == axis).unwrap_or(0)
    }

    /// the permutation that takes an array laid out in this order into `target`
    pub fn permutation_to(&self, target: AxisOrder) -> Permutation {
        let axes = target.0;
        Permutation([
            self.position(axes[0]),
            self.position(axes[1]),
            self.position(axes[2]),
        ])
    }

    /// reorder a declared-order triple into X, Y, Z order
    pub fn to_xyz<T: Copy>(&self, values: [T; 3]) -> [T; 3] {
        let mut out = values;
        for (value, axis) in values.iter().zip(self.0) {
            out[axis.index()] = *value;
        }
        out
    }
}

impl Default for AxisOrder {
    fn default() -> Self {
        Self::ZYX
    }
}

impl FromStr for AxisOrder {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GridError::InvalidAxisOrder(s.to_string());

        let axes: Vec<Axis> = s
            .chars()
            .map(Axis::from_char)
            .collect::<Option<_>>()
            .ok_or_else(invalid)?;

        let axes: [Axis; 3] = axes.try_into().map_err(|_| invalid())?;
        Self::new(axes).map_err(|_| invalid())
    }
}

impl TryFrom<String> for AxisOrder {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.0 {
            write!(f, "{}", axis.suffix().to_ascii_lowercase())?;
        }
        Ok(())
    }
}

/// Axis permutation of a 3D array: axis `k` of the output is axis `self.axes()[k]` of
/// the input. This is the same convention as `ndarray`'s `permuted_axes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permutation([usize; 3]);

impl Permutation {
    pub const IDENTITY: Permutation = Permutation([0, 1, 2]);

    pub fn axes(&self) -> [usize; 3] {
        self.0
    }

    pub fn inverse(&self) -> Permutation {
        let mut inverse = [0; 3];
        for (k, axis) in self.0.iter().enumerate() {
            inverse[*axis] = k;
        }
        Permutation(inverse)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// the shape of an array of shape `shape` after this permutation
    pub fn apply<T: Copy>(&self, shape: [T; 3]) -> [T; 3] {
        [shape[self.0[0]], shape[self.0[1]], shape[self.0[2]]]
    }
}

/// `grid_info` exactly as it appears in the volume JSON
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawGridInfo {
    #[serde(default)]
    pub dimensions: Option<Vec<f64>>,
    #[serde(default, alias = "spacing")]
    pub voxel_size: Option<Vec<f64>>,
    #[serde(default)]
    pub origin: Option<Vec<f64>>,
}

/// Validated description of a structured grid in its declared axis order.
///
/// One `GridSpec` is built per run and shared by every volume frame of that run.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    dimensions: [usize; 3],
    spacing: [f64; 3],
    origin: [f64; 3],
    order: AxisOrder,
}

impl GridSpec {
    pub fn new(
        dimensions: [usize; 3],
        spacing: [f64; 3],
        origin: [f64; 3],
        order: AxisOrder,
    ) -> Result<Self, GridError> {
        let valid = dimensions.iter().all(|n| *n > 0)
            && dimensions
                .iter()
                .try_fold(1usize, |acc, n| acc.checked_mul(*n))
                .is_some();

        if !valid {
            return Err(GridError::InvalidDimensions(
                dimensions.iter().map(|n| *n as f64).collect(),
            ));
        }

        Ok(Self {
            dimensions,
            spacing,
            origin,
            order,
        })
    }

    /// Validate a raw `grid_info` record whose triples are listed in `order`
    pub fn from_raw(raw: &RawGridInfo, order: AxisOrder) -> Result<Self, GridError> {
        let dimensions = triple(&raw.dimensions, "dimensions")?;
        let spacing = triple(&raw.voxel_size, "voxel_size")?;
        let origin = triple(&raw.origin, "origin")?;

        let integral = dimensions
            .iter()
            .all(|n| n.is_finite() && *n >= 1.0 && n.fract() == 0.0 && *n <= usize::MAX as f64);

        if !integral {
            return Err(GridError::InvalidDimensions(dimensions.to_vec()));
        }

        let dimensions = [
            dimensions[0] as usize,
            dimensions[1] as usize,
            dimensions[2] as usize,
        ];

        Self::new(dimensions, spacing, origin, order)
    }

    /// dimensions in the declared axis order
    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    /// spacing in the declared axis order
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// origin in the declared axis order
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn order(&self) -> AxisOrder {
        self.order
    }

    /// total number of grid points
    pub fn num_points(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// permutation from the declared layout to the vtk point layout
    pub fn permutation(&self) -> Permutation {
        self.order.permutation_to(AxisOrder::VTK)
    }

    /// array shape of a field once it is in the vtk point layout (slowest axis first)
    pub fn target_shape(&self) -> [usize; 3] {
        self.permutation().apply(self.dimensions)
    }

    /// number of points along X, Y and Z
    pub fn target_dimensions(&self) -> [usize; 3] {
        self.order.to_xyz(self.dimensions)
    }

    /// spacing along X, Y and Z
    pub fn target_spacing(&self) -> [f64; 3] {
        self.order.to_xyz(self.spacing)
    }

    /// origin as an X, Y, Z coordinate
    pub fn target_origin(&self) -> [f64; 3] {
        self.order.to_xyz(self.origin)
    }
}

fn triple(values: &Option<Vec<f64>>, field: &'static str) -> Result<[f64; 3], GridError> {
    let values = values.as_ref().ok_or(GridError::MissingGridField(field))?;

    match values.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(GridError::MalformedGridSpec {
            field,
            len: values.len(),
        }),
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum GridError {
    #[error("grid_info is missing required field `{0}`")]
    MissingGridField(&'static str),
    #[error("grid_info field `{field}` must have exactly 3 components, found {len}")]
    MalformedGridSpec { field: &'static str, len: usize },
    #[error("grid dimensions must be positive integers, got {0:?}")]
    InvalidDimensions(Vec<f64>),
    #[error("axis order `{0}` must name each of x, y and z exactly once")]
    InvalidAxisOrder(String),
}
