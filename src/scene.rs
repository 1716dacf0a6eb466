//! # Scene Assembly
//!
//! An authoring tool is only ever driven through the [`SceneHost`] trait: create a
//! geometry or volume object, replace its buffers, keyframe the current state, and
//! persist the scene. The host is an explicit session handle passed by `&mut` to the
//! [`SceneAssembler`]; nothing here keeps global state.
//!
//! [`SceneDocument`] is the host this crate ships. It records the assembled scene in
//! memory and persists it as one JSON document.
//!
//! Volume channels are declared up front from the fields of the first timestep. A field
//! that only shows up in a later timestep is declared when it first appears, with a
//! warning. A channel the host rejects is skipped for that frame and handed back to the
//! caller as a [`RejectedChannel`].

use crate::grid::GridSpec;
use crate::input::VolumeTimestep;
use crate::mesh::{MeshFrame, StaticMesh};
use crate::prelude::*;
use crate::volume::{self, ChannelLayout, FieldData, FieldKind};

use serde::Serialize;
use std::path::Path;

/// name given to the volume object when the record has no `volume_name`
pub const DEFAULT_VOLUME_NAME: &str = "FluidVolume";

/// Handle of an object created by a [`SceneHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(pub usize);

/// Where the points of a volume channel sit: point counts, origin and spacing along X, Y, Z
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelPlacement {
    pub dimensions: [usize; 3],
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
}

impl ChannelPlacement {
    pub fn from_grid(grid: &GridSpec) -> Self {
        Self {
            dimensions: grid.target_dimensions(),
            origin: grid.target_origin(),
            spacing: grid.target_spacing(),
        }
    }

    pub fn num_points(&self) -> usize {
        self.dimensions.iter().product()
    }
}

/// The operations an authoring tool has to offer to receive an assembled scene
pub trait SceneHost {
    /// create an empty geometry object
    fn create_geometry(&mut self, name: &str) -> ObjectId;

    /// replace the point and face buffers of a geometry object
    fn replace_geometry(
        &mut self,
        object: ObjectId,
        points: &[[f64; 3]],
        faces: &[Vec<usize>],
    ) -> Result<(), SceneError>;

    /// keyframe the current geometry of an object
    fn keyframe_geometry(&mut self, object: ObjectId, frame: i64) -> Result<(), SceneError>;

    /// create an empty volume object
    fn create_volume(&mut self, name: &str) -> ObjectId;

    /// declare a grid channel with `components` values per point
    fn declare_channel(
        &mut self,
        volume: ObjectId,
        name: &str,
        components: usize,
        placement: &ChannelPlacement,
    ) -> Result<(), SceneError>;

    fn has_channel(&self, volume: ObjectId, name: &str) -> bool;

    /// set every point value of a channel. Multi component channels take their values
    /// interleaved per point.
    fn set_channel_values(
        &mut self,
        volume: ObjectId,
        name: &str,
        values: &[f64],
    ) -> Result<(), SceneError>;

    /// keyframe the current values of a channel
    fn keyframe_channel(&mut self, volume: ObjectId, name: &str, frame: i64) -> Result<(), SceneError>;

    fn set_frame_range(&mut self, start: i64, end: i64);

    /// write the whole scene to `path`
    fn persist(&mut self, path: &Path) -> Result<(), Error>;

    /// whether channels may carry more than one component per point. Vector fields are
    /// split into `_X`, `_Y`, `_Z` scalar channels otherwise.
    fn supports_vector_channels(&self) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("the scene has no {expected} object with id {object}")]
    UnknownObject {
        object: usize,
        expected: &'static str,
    },
    #[error("channel `{channel}` was not declared")]
    UndeclaredChannel { channel: String },
    #[error("channel `{channel}` has {components} components, this host only stores scalar channels")]
    UnsupportedComponents { channel: String, components: usize },
    #[error("channel `{channel}` expects {expected} values, got {actual}")]
    ChannelSizeMismatch {
        channel: String,
        expected: usize,
        actual: usize,
    },
    #[error("object `{name}` only received part of its frames")]
    IncompleteObject { name: String },
}

/// A channel the host refused to take for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedChannel {
    pub channel: String,
    pub error: SceneError,
}

/// Drives a [`SceneHost`] from mesh and volume frames and keeps track of the frame range
/// they cover.
pub struct SceneAssembler<'h, H: SceneHost> {
    host: &'h mut H,
    range: Option<(i64, i64)>,
}

impl<'h, H: SceneHost> SceneAssembler<'h, H> {
    pub fn new(host: &'h mut H) -> Self {
        Self { host, range: None }
    }

    fn extend_range(&mut self, frame: i64) {
        self.range = Some(match self.range {
            Some((start, end)) => (start.min(frame), end.max(frame)),
            None => (frame, frame),
        });
    }

    /// the smallest and largest keyframe added so far
    pub fn frame_range(&self) -> Option<(i64, i64)> {
        self.range
    }

    /// Create the geometry object of a mesh from its reference frame
    pub fn add_mesh(&mut self, mesh: &StaticMesh) -> Result<ObjectId, Error> {
        let object = self.host.create_geometry(mesh.name());
        let reference = mesh.reference();
        self.host
            .replace_geometry(object, reference.points(), mesh.topology().faces())?;
        Ok(object)
    }

    /// Replace the geometry of `object` with a frame and keyframe it
    pub fn add_mesh_frame(&mut self, object: ObjectId, frame: &MeshFrame) -> Result<(), Error> {
        self.host
            .replace_geometry(object, frame.points(), frame.topology().faces())?;
        self.host.keyframe_geometry(object, frame.frame)?;
        self.extend_range(frame.frame);
        Ok(())
    }

    /// Create a volume object and declare a channel for every field of the first timestep
    pub fn add_volume(
        &mut self,
        name: &str,
        grid: &GridSpec,
        first: Option<&VolumeTimestep>,
    ) -> Result<ObjectId, Error> {
        let object = self.host.create_volume(name);
        let placement = ChannelPlacement::from_grid(grid);

        if let Some(step) = first {
            for (channel, kind) in volume::declared_channels(step, self.layout()) {
                self.host
                    .declare_channel(object, &channel, components(kind), &placement)?;
            }
        }

        Ok(object)
    }

    /// Set and keyframe every channel of a volume frame. A channel the host rejects is
    /// skipped for this frame only and returned.
    pub fn add_volume_frame(
        &mut self,
        object: ObjectId,
        frame: &VolumeFrame,
    ) -> Result<Vec<RejectedChannel>, Error> {
        let placement = ChannelPlacement::from_grid(frame.grid());
        let mut rejected = Vec::new();

        for (channel, kind, values) in self.channels_of(frame) {
            if !self.host.has_channel(object, &channel) {
                log::warn!(
                    "frame {}: channel `{}` was not present in the first timestep, declaring it now",
                    frame.frame_index,
                    channel
                );
                self.host
                    .declare_channel(object, &channel, components(kind), &placement)?;
            }

            let result = self
                .host
                .set_channel_values(object, &channel, &values)
                .and_then(|_| self.host.keyframe_channel(object, &channel, frame.frame));

            if let Err(error) = result {
                log::warn!("frame {}: skipping channel `{}`: {}", frame.frame_index, channel, error);
                rejected.push(RejectedChannel { channel, error });
            }
        }

        self.extend_range(frame.frame);
        Ok(rejected)
    }

    /// Set the frame range to the keyframes added, and persist the scene when `path` is given
    pub fn finish(self, path: Option<&Path>) -> Result<(), Error> {
        if let Some((start, end)) = self.range {
            self.host.set_frame_range(start, end);
        }

        if let Some(path) = path {
            self.host.persist(path)?;
        }

        Ok(())
    }

    fn layout(&self) -> ChannelLayout {
        if self.host.supports_vector_channels() {
            ChannelLayout::Vector
        } else {
            ChannelLayout::Split
        }
    }

    fn channels_of(&self, frame: &VolumeFrame) -> Vec<(String, FieldKind, Vec<f64>)> {
        match self.layout() {
            ChannelLayout::Split => frame
                .scalar_channels()
                .into_iter()
                .map(|(name, values)| (name, FieldKind::Scalar, values))
                .collect(),
            ChannelLayout::Vector => frame
                .fields()
                .iter()
                .map(|field| match &field.data {
                    FieldData::Scalar(values) => (field.name.clone(), FieldKind::Scalar, values.to_vec()),
                    FieldData::Vector(points) => (
                        field.name.clone(),
                        FieldKind::Vector,
                        points.iter().flatten().copied().collect(),
                    ),
                })
                .collect(),
        }
    }
}

fn components(kind: FieldKind) -> usize {
    match kind {
        FieldKind::Scalar => 1,
        FieldKind::Vector => 3,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryKeyframe {
    pub frame: i64,
    pub points: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryObject {
    pub name: String,
    pub points: Vec<[f64; 3]>,
    pub faces: Vec<Vec<usize>>,
    pub keyframes: Vec<GeometryKeyframe>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelKeyframe {
    pub frame: i64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub name: String,
    pub components: usize,
    pub placement: ChannelPlacement,
    #[serde(skip)]
    pub values: Vec<f64>,
    pub keyframes: Vec<ChannelKeyframe>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeObject {
    pub name: String,
    pub channels: Vec<Channel>,
}

impl VolumeObject {
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.name == name)
    }

    fn channel_mut(&mut self, name: &str) -> Result<&mut Channel, SceneError> {
        self.channels
            .iter_mut()
            .find(|channel| channel.name == name)
            .ok_or_else(|| SceneError::UndeclaredChannel {
                channel: name.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneObject {
    Geometry(GeometryObject),
    Volume(VolumeObject),
}

/// A [`SceneHost`] that records the scene and persists it as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneDocument {
    #[serde(skip)]
    vector_channels: bool,
    frame_start: Option<i64>,
    frame_end: Option<i64>,
    objects: Vec<SceneObject>,
}

impl SceneDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// a document whose channels may carry 3-component vectors
    pub fn with_vector_channels() -> Self {
        Self {
            vector_channels: true,
            ..Self::default()
        }
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn frame_range(&self) -> Option<(i64, i64)> {
        self.frame_start.zip(self.frame_end)
    }

    pub fn geometry(&self, object: ObjectId) -> Option<&GeometryObject> {
        match self.objects.get(object.0) {
            Some(SceneObject::Geometry(geometry)) => Some(geometry),
            _ => None,
        }
    }

    pub fn volume(&self, object: ObjectId) -> Option<&VolumeObject> {
        match self.objects.get(object.0) {
            Some(SceneObject::Volume(volume)) => Some(volume),
            _ => None,
        }
    }

    fn geometry_mut(&mut self, object: ObjectId) -> Result<&mut GeometryObject, SceneError> {
        match self.objects.get_mut(object.0) {
            Some(SceneObject::Geometry(geometry)) => Ok(geometry),
            _ => Err(SceneError::UnknownObject {
                object: object.0,
                expected: "geometry",
            }),
        }
    }

    fn volume_mut(&mut self, object: ObjectId) -> Result<&mut VolumeObject, SceneError> {
        match self.objects.get_mut(object.0) {
            Some(SceneObject::Volume(volume)) => Ok(volume),
            _ => Err(SceneError::UnknownObject {
                object: object.0,
                expected: "volume",
            }),
        }
    }

    fn push(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }
}

impl SceneHost for SceneDocument {
    fn create_geometry(&mut self, name: &str) -> ObjectId {
        self.push(SceneObject::Geometry(GeometryObject {
            name: name.to_string(),
            points: Vec::new(),
            faces: Vec::new(),
            keyframes: Vec::new(),
        }))
    }

    fn replace_geometry(
        &mut self,
        object: ObjectId,
        points: &[[f64; 3]],
        faces: &[Vec<usize>],
    ) -> Result<(), SceneError> {
        let geometry = self.geometry_mut(object)?;
        geometry.points = points.to_vec();
        if geometry.faces != faces {
            geometry.faces = faces.to_vec();
        }
        Ok(())
    }

    fn keyframe_geometry(&mut self, object: ObjectId, frame: i64) -> Result<(), SceneError> {
        let geometry = self.geometry_mut(object)?;
        let points = geometry.points.clone();
        geometry.keyframes.push(GeometryKeyframe { frame, points });
        Ok(())
    }

    fn create_volume(&mut self, name: &str) -> ObjectId {
        self.push(SceneObject::Volume(VolumeObject {
            name: name.to_string(),
            channels: Vec::new(),
        }))
    }

    fn declare_channel(
        &mut self,
        volume: ObjectId,
        name: &str,
        components: usize,
        placement: &ChannelPlacement,
    ) -> Result<(), SceneError> {
        if components != 1 && !self.vector_channels {
            return Err(SceneError::UnsupportedComponents {
                channel: name.to_string(),
                components,
            });
        }

        let volume = self.volume_mut(volume)?;

        if volume.channel(name).is_none() {
            volume.channels.push(Channel {
                name: name.to_string(),
                components,
                placement: placement.clone(),
                values: Vec::new(),
                keyframes: Vec::new(),
            });
        }

        Ok(())
    }

    fn has_channel(&self, volume: ObjectId, name: &str) -> bool {
        self.volume(volume)
            .map(|volume| volume.channel(name).is_some())
            .unwrap_or(false)
    }

    fn set_channel_values(
        &mut self,
        volume: ObjectId,
        name: &str,
        values: &[f64],
    ) -> Result<(), SceneError> {
        let channel = self.volume_mut(volume)?.channel_mut(name)?;
        let expected = channel.placement.num_points() * channel.components;

        if values.len() != expected {
            return Err(SceneError::ChannelSizeMismatch {
                channel: name.to_string(),
                expected,
                actual: values.len(),
            });
        }

        channel.values = values.to_vec();
        Ok(())
    }

    fn keyframe_channel(&mut self, volume: ObjectId, name: &str, frame: i64) -> Result<(), SceneError> {
        let channel = self.volume_mut(volume)?.channel_mut(name)?;
        let values = channel.values.clone();
        channel.keyframes.push(ChannelKeyframe { frame, values });
        Ok(())
    }

    fn set_frame_range(&mut self, start: i64, end: i64) {
        self.frame_start = Some(start);
        self.frame_end = Some(end);
    }

    fn persist(&mut self, path: &Path) -> Result<(), Error> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    fn supports_vector_channels(&self) -> bool {
        self.vector_channels
    }
}
