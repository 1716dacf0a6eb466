//! # Volume Frames
//!
//! One [`VolumeFrame`] is built per timestep of the volume record. It shares the run's
//! [`GridSpec`] and holds every field of that timestep that passed validation, already
//! reordered into the vtk point layout.
//!
//! A timestep key ending in `_data` is a field (`density_data` is the `density` field).
//! Its kind is read from the payload: a list of numbers is a scalar field, a list of
//! lists is a vector field.
//!
//! A field that fails validation is left out of its frame, and the error is handed back
//! next to the frame. Nothing is ever zero-filled, so a missing field stays missing.

use crate::array::{FieldError, ScalarField, VectorField};
use crate::grid::{Axis, GridSpec};
use crate::input::{self, VolumeTimestep};
use crate::prelude::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How vector fields are presented to a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    /// one array with 3 components
    #[default]
    Vector,
    /// three scalar arrays `<name>_X`, `<name>_Y`, `<name>_Z`
    Split,
}

/// the kind of a field, read from the shape of its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Vector,
}

impl FieldKind {
    /// `None` when the payload is neither a list of numbers nor a list of lists
    pub fn of(value: &Value) -> Option<Self> {
        let entries = value.as_array()?;

        if entries.iter().all(Value::is_number) {
            Some(Self::Scalar)
        } else if entries.iter().all(Value::is_array) {
            Some(Self::Vector)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Scalar(ScalarField),
    Vector(VectorField),
}

impl FieldData {
    /// Validate a raw field payload against `grid` and reorder it into the vtk layout
    pub fn from_value(name: &str, value: &Value, grid: &GridSpec) -> Result<Self, FieldError> {
        let malformed = || FieldError::MalformedField {
            field_name: name.to_string(),
        };

        let entries = value.as_array().ok_or_else(malformed)?;

        match FieldKind::of(value).ok_or_else(malformed)? {
            FieldKind::Scalar => {
                let values = entries
                    .iter()
                    .map(|v| v.as_f64().ok_or_else(malformed))
                    .collect::<Result<Vec<_>, _>>()?;

                ScalarField::from_declared(name, values, grid).map(Self::Scalar)
            }
            FieldKind::Vector => {
                let points = entries
                    .iter()
                    .map(|point| {
                        point
                            .as_array()
                            .into_iter()
                            .flatten()
                            .map(|v| v.as_f64().ok_or_else(malformed))
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                VectorField::from_declared(name, points, grid).map(Self::Vector)
            }
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Scalar(_) => FieldKind::Scalar,
            Self::Vector(_) => FieldKind::Vector,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedField {
    pub name: String,
    pub data: FieldData,
}

/// the names a field is exposed under for a given layout
pub fn channel_names(name: &str, kind: FieldKind, layout: ChannelLayout) -> Vec<String> {
    match (kind, layout) {
        (FieldKind::Vector, ChannelLayout::Split) => [Axis::X, Axis::Y, Axis::Z]
            .iter()
            .map(|axis| format!("{}_{}", name, axis.suffix()))
            .collect(),
        _ => vec![name.to_string()],
    }
}

/// Every channel a timestep carries, in field name order. Fields whose kind cannot be
/// told from the payload are skipped.
pub fn declared_channels(step: &VolumeTimestep, layout: ChannelLayout) -> Vec<(String, FieldKind)> {
    step.fields()
        .filter_map(|(name, value)| FieldKind::of(value).map(|kind| (name, kind)))
        .flat_map(|(name, kind)| {
            let channel_kind = match layout {
                ChannelLayout::Split => FieldKind::Scalar,
                ChannelLayout::Vector => kind,
            };

            channel_names(name, kind, layout)
                .into_iter()
                .map(move |channel| (channel, channel_kind))
        })
        .collect()
}

/// The validated fields of one volume timestep
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeFrame {
    /// position of the timestep in the input list
    pub frame_index: usize,
    /// declared frame number, used for keyframing
    pub frame: i64,
    /// declared simulation time
    pub time: f64,
    grid: Arc<GridSpec>,
    fields: Vec<NamedField>,
}

impl VolumeFrame {
    /// Build the frame of one timestep. Fields that fail validation are logged, left out
    /// of the frame, and returned next to it.
    pub fn build(
        grid: &Arc<GridSpec>,
        frame_index: usize,
        step: &VolumeTimestep,
    ) -> (Self, Vec<FieldError>) {
        let mut fields = Vec::new();
        let mut omitted = Vec::new();

        for (name, value) in step.fields() {
            match FieldData::from_value(name, value, grid) {
                Ok(data) => fields.push(NamedField {
                    name: name.to_string(),
                    data,
                }),
                Err(e) => {
                    log::warn!("frame {}: skipping field `{}`: {}", frame_index, name, e);
                    omitted.push(e);
                }
            }
        }

        let frame = Self {
            frame_index,
            frame: input::frame_or_index(step.frame, frame_index),
            time: input::time_or_index(step.time, frame_index),
            grid: Arc::clone(grid),
            fields,
        };

        (frame, omitted)
    }

    pub fn grid(&self) -> &Arc<GridSpec> {
        &self.grid
    }

    pub fn fields(&self) -> &[NamedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldData> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.data)
    }

    /// Every field as scalar channels: vector fields are split into one channel per
    /// component
    pub fn scalar_channels(&self) -> Vec<(String, Vec<f64>)> {
        let mut channels = Vec::new();

        for field in &self.fields {
            match &field.data {
                FieldData::Scalar(values) => channels.push((field.name.clone(), values.to_vec())),
                FieldData::Vector(points) => {
                    for axis in [Axis::X, Axis::Y, Axis::Z] {
                        channels.push((
                            format!("{}_{}", field.name, axis.suffix()),
                            points.component(axis),
                        ));
                    }
                }
            }
        }

        channels
    }

    /// the `ImageData` description of this frame's grid
    pub fn domain(&self) -> ImageDomain {
        ImageDomain::from_grid(&self.grid)
    }

    /// the point data of this frame with vector fields presented as `layout`
    pub fn point_fields(&self, layout: ChannelLayout) -> PointFields<'_> {
        PointFields {
            frame: self,
            layout,
        }
    }
}

/// zero based, inclusive point extents along X, Y and Z as vtk expects them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extent {
    pub x_start: usize,
    pub x_end: usize,
    pub y_start: usize,
    pub y_end: usize,
    pub z_start: usize,
    pub z_end: usize,
}

impl Extent {
    /// the whole extent of a grid with the given number of points along X, Y and Z
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            x_start: 0,
            x_end: nx.saturating_sub(1),
            y_start: 0,
            y_end: ny.saturating_sub(1),
            z_start: 0,
            z_end: nz.saturating_sub(1),
        }
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.x_start, self.x_end, self.y_start, self.y_end, self.z_start, self.z_end
        )
    }
}

/// Full information on a uniform grid as it is written to an `ImageData` file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDomain {
    pub extent: Extent,
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
}

impl ImageDomain {
    pub fn from_grid(grid: &GridSpec) -> Self {
        let [nx, ny, nz] = grid.target_dimensions();

        Self {
            extent: Extent::new(nx, ny, nz),
            origin: grid.target_origin(),
            spacing: grid.target_spacing(),
        }
    }
}

fn join(values: &[f64]) -> String {
    let mut out = String::new();
    values.push_ascii(&mut out);
    out
}

impl Domain for ImageDomain {
    fn dataset_type(&self) -> &'static str {
        "ImageData"
    }

    fn dataset_attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("WholeExtent", self.extent.to_string()),
            ("Origin", join(&self.origin)),
            ("Spacing", join(&self.spacing)),
        ]
    }

    fn piece_attributes(&self) -> Vec<(&'static str, String)> {
        vec![("Extent", self.extent.to_string())]
    }

    // image data has no geometry arrays
    fn write_geometry<W: Write, E: Encode>(&self, _: &mut ArrayWriter<W, E>) -> Result<(), Error> {
        Ok(())
    }
}

/// The point data of a [`VolumeFrame`]
#[derive(Debug, Clone, Copy)]
pub struct PointFields<'a> {
    frame: &'a VolumeFrame,
    layout: ChannelLayout,
}

impl<'a> DataArray for PointFields<'a> {
    fn active_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attributes = Vec::new();

        let scalar = self
            .frame
            .fields
            .iter()
            .find(|field| field.data.kind() == FieldKind::Scalar);

        if let Some(field) = scalar {
            attributes.push(("Scalars", field.name.clone()));
        }

        if self.layout == ChannelLayout::Vector {
            let vector = self
                .frame
                .fields
                .iter()
                .find(|field| field.data.kind() == FieldKind::Vector);

            if let Some(field) = vector {
                attributes.push(("Vectors", field.name.clone()));
            }
        }

        attributes
    }

    fn write_point_data<W: Write, E: Encode>(
        &self,
        writer: &mut ArrayWriter<W, E>,
    ) -> Result<(), Error> {
        for field in &self.frame.fields {
            match (&field.data, self.layout) {
                (FieldData::Scalar(values), _) => writer.write_array(&field.name, values.as_slice())?,
                (FieldData::Vector(points), ChannelLayout::Vector) => {
                    writer.write_array(&field.name, points.as_slice())?
                }
                (FieldData::Vector(points), ChannelLayout::Split) => {
                    for axis in [Axis::X, Axis::Y, Axis::Z] {
                        let name = format!("{}_{}", field.name, axis.suffix());
                        writer.write_array(&name, points.component(axis).as_slice())?;
                    }
                }
            }
        }

        Ok(())
    }
}
