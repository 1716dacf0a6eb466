//! run configuration, read from a json file
//!
//! Every key is optional:
//!
//! ```json
//! {
//!     "mesh": "simulation_output/fluid_mesh_data.json",
//!     "volume": "simulation_output/fluid_volume_data.json",
//!     "output_dir": "output",
//!     "encoding": "binary",
//!     "source_axis_order": "zyx",
//!     "vector_layout": "vector",
//!     "mesh_series": true
//! }
//! ```

use crate::grid::AxisOrder;
use crate::volume::ChannelLayout;
use crate::Error;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How the arrays of the written vtk files are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingKind {
    /// raw little endian bytes in an appended section
    #[default]
    Binary,
    /// inline base64
    Base64,
    /// inline text
    Ascii,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// surface mesh record; no geometry is written without it
    pub mesh: Option<PathBuf>,
    /// volume record; no frames or manifest are written without it
    pub volume: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub geometry_file: String,
    pub frame_prefix: String,
    /// `null` skips the volume manifest
    pub manifest_file: Option<String>,
    pub encoding: EncodingKind,
    /// axis order of the volume's `grid_info` triples, slowest varying first
    pub source_axis_order: AxisOrder,
    pub vector_layout: ChannelLayout,
    /// also write one `.vtp` per mesh timestep, with its own manifest
    pub mesh_series: bool,
    pub mesh_frame_prefix: String,
    pub mesh_manifest_file: String,
    /// `null` skips scene assembly
    pub scene_file: Option<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            mesh: None,
            volume: None,
            output_dir: PathBuf::from("output"),
            geometry_file: "turbine_geometry.vtp".to_string(),
            frame_prefix: "fluid_data_t".to_string(),
            manifest_file: Some("turbine_flow_animation.pvd".to_string()),
            encoding: EncodingKind::default(),
            source_axis_order: AxisOrder::default(),
            vector_layout: ChannelLayout::default(),
            mesh_series: false,
            mesh_frame_prefix: "fluid_mesh_t".to_string(),
            mesh_manifest_file: "fluid_mesh_animation.pvd".to_string(),
            scene_file: Some("final_animation_scene.json".to_string()),
        }
    }
}

impl ConvertConfig {
    /// Read a configuration file. Relative input and output paths are kept as they are,
    /// so they resolve against the working directory.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        crate::input::load_json(path)
    }

    /// path of the `index`th volume frame file
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}{:04}.vti", self.frame_prefix, index))
    }

    /// path of the `index`th mesh frame file
    pub fn mesh_frame_path(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}{:04}.vtp", self.mesh_frame_prefix, index))
    }
}
