//! Convert JSON fluid simulation output into visualization ready files.
//!
//! A simulation run is stored as two JSON documents: a surface mesh whose vertices move
//! over time against a fixed face list, and a volume of scalar / vector fields sampled on a
//! structured grid. `fluid-vtk` turns them into
//!
//! * a VTK `PolyData` file (`.vtp`) for the surface,
//! * one VTK `ImageData` file (`.vti`) per volume timestep,
//! * a ParaView collection manifest (`.pvd`) indexing the `.vti` files by simulation time,
//! * a keyframed scene assembled through the [`SceneHost`](`crate::scene::SceneHost`) contract.
//!
//! The fields in the JSON are flattened in the simulation's declared axis order
//! (usually `Z, Y, X`, slowest to fastest). Every reordering into the layout VTK expects
//! happens in [`permute_points`](`crate::array::permute_points`).
//!
//! Most users only need [`run`] with a [`ConvertConfig`]:
//!
//! ```no_run
//! let config = fluid_vtk::ConvertConfig::from_path("convert.json".as_ref()).unwrap();
//! let report = fluid_vtk::run(&config);
//! println!("{report}");
//! ```

pub mod array;
pub mod config;
pub mod convert;
mod data;
pub mod grid;
pub mod input;
pub mod mesh;
pub mod prelude;
pub mod scene;
pub mod series;
mod traits;
pub mod volume;
mod write_vtk;

pub use traits::{Array, DataArray, Domain, Encode, Numeric};

pub use data::VtkData;

pub use array::{permute_points, FieldError, ScalarField, VectorField};
pub use grid::{Axis, AxisOrder, GridError, GridSpec, Permutation};
pub use mesh::{MeshError, MeshFrame, StaticMesh, Topology};
pub use volume::{ChannelLayout, FieldData, ImageDomain, VolumeFrame};

pub use config::{ConvertConfig, EncodingKind};
pub use convert::{run, ArtifactOutcome, Omission, OmissionError, RunReport};
pub use series::{IndexError, TimeSeriesEntry, TimeSeriesIndex};

pub use write_vtk::{write_vtk, write_vtk_encoded, ArrayWriter, Format, Precision};

pub use ndarray;

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("Could not decode json input: `{0}`")]
    Json(#[from] serde_json::Error),
    #[error("Could not write XML data to file: `{0}`")]
    XmlWrite(#[from] quick_xml::Error),
    #[error("{0}")]
    MissingKey(MissingKey),
    #[error(transparent)]
    Grid(#[from] grid::GridError),
    #[error(transparent)]
    Field(#[from] array::FieldError),
    #[error(transparent)]
    Mesh(#[from] mesh::MeshError),
    #[error(transparent)]
    Index(#[from] series::IndexError),
    #[error(transparent)]
    Manifest(#[from] series::ManifestError),
    #[error(transparent)]
    Scene(#[from] scene::SceneError),
}

impl Error {
    /// Which class of failure this is. The class decides how far a failure reaches:
    /// config and io failures abort the artifact being produced, validation failures
    /// are reported at the frame (or field) where they were found.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Json(_) | Self::XmlWrite(_) | Self::Manifest(_) => ErrorKind::Io,
            Self::MissingKey(_) | Self::Grid(_) | Self::Index(_) => ErrorKind::Config,
            Self::Field(_) | Self::Mesh(_) | Self::Scene(_) => ErrorKind::Validation,
        }
    }
}

impl From<MissingKey> for Error {
    fn from(x: MissingKey) -> Self {
        Self::MissingKey(x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// bad grid description or missing required top level keys
    Config,
    /// per field / per frame shape problems
    Validation,
    /// file system, decoding, and encoding failures
    Io,
}

/// A required key was absent from one of the input records
#[derive(derive_more::Display, derive_more::Constructor, Debug, Clone, PartialEq)]
#[display(fmt = "missing required key `{key}` in {record} record")]
pub struct MissingKey {
    pub record: &'static str,
    pub key: &'static str,
}

/// appended raw binary encoding marker type
#[derive(Debug, Clone, PartialEq)]
pub struct Binary;

/// inline base64 encoding marker type
#[derive(Debug, Clone, PartialEq)]
pub struct Base64;

/// inline ascii encoding marker type
#[derive(Debug, Clone, PartialEq)]
pub struct Ascii;

impl traits::Encode for Binary {
    const FORMAT: Format = Format::Appended;
}

impl traits::Encode for Ascii {
    const FORMAT: Format = Format::Ascii;
}

impl traits::Encode for Base64 {
    const FORMAT: Format = Format::Base64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        let missing = Error::from(MissingKey::new("volume", "grid_info"));
        assert_eq!(missing.kind(), ErrorKind::Config);
        assert_eq!(
            missing.to_string(),
            "missing required key `grid_info` in volume record"
        );

        let io = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.kind(), ErrorKind::Io);

        let field = Error::from(FieldError::size_mismatch("velocity", 3, 2));
        assert_eq!(field.kind(), ErrorKind::Validation);
    }
}
