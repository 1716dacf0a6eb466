//! serde models of the simulation JSON documents
//!
//! Most keys are optional and vertex / field payloads stay raw json values. Missing and
//! malformed keys are reported by the component that reads them, with the frame and field
//! they belong to.

use crate::grid::RawGridInfo;
use crate::Error;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// suffix carried by every volume field key (`density_data`)
pub const FIELD_SUFFIX: &str = "_data";

/// read and decode a json document from `path`
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let value = serde_json::from_reader(reader)?;
    Ok(value)
}

/// `fluid_mesh_data.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeshRecord {
    #[serde(default)]
    pub mesh_name: Option<String>,
    #[serde(default)]
    pub static_faces: Option<Vec<Vec<i64>>>,
    #[serde(default)]
    pub time_steps: Vec<MeshTimestep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeshTimestep {
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub frame: Option<i64>,
    /// either a list of points or a list of groups of points
    #[serde(default)]
    pub vertices: Option<Value>,
}

/// `fluid_volume_data.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeRecord {
    #[serde(default)]
    pub volume_name: Option<String>,
    #[serde(default)]
    pub grid_info: Option<RawGridInfo>,
    #[serde(default)]
    pub time_steps: Vec<VolumeTimestep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeTimestep {
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub frame: Option<i64>,
    /// every other key of the timestep; the ones ending in `_data` are fields
    #[serde(flatten)]
    pub entries: BTreeMap<String, Value>,
}

impl VolumeTimestep {
    /// the field payloads of this timestep with their channel names (`density_data` is
    /// the `density` channel), sorted by name
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().filter_map(|(key, value)| {
            key.strip_suffix(FIELD_SUFFIX)
                .filter(|name| !name.is_empty())
                .map(|name| (name, value))
        })
    }
}

/// declared time of a timestep, falling back to its position in the list
pub(crate) fn time_or_index(time: Option<f64>, index: usize) -> f64 {
    time.unwrap_or(index as f64)
}

/// declared frame number of a timestep, falling back to its position in the list
pub(crate) fn frame_or_index(frame: Option<i64>, index: usize) -> i64 {
    frame.unwrap_or(index as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_fields_are_stripped() {
        let step: VolumeTimestep = serde_json::from_str(
            r#"{
                "time": 0.01,
                "frame": 0,
                "density_data": [1.0],
                "velocity_data": [[0.0, 0.0, 0.0]],
                "notes": "ignored",
                "_data": [2.0]
            }"#,
        )
        .unwrap();

        assert_eq!(step.time, Some(0.01));
        assert_eq!(step.frame, Some(0));

        let names: Vec<&str> = step.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["density", "velocity"]);
    }

    #[test]
    fn optional_keys() {
        let record: VolumeRecord = serde_json::from_str(r#"{"time_steps": [{}]}"#).unwrap();
        assert!(record.grid_info.is_none());
        assert_eq!(record.time_steps.len(), 1);
        assert_eq!(time_or_index(record.time_steps[0].time, 4), 4.0);

        let record: MeshRecord = serde_json::from_str(r#"{"mesh_name": "FluidSurface"}"#).unwrap();
        assert!(record.static_faces.is_none());
        assert!(record.time_steps.is_empty());
    }
}
