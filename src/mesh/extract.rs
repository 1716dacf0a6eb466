use super::{MeshError, MeshFrame};
use crate::input::{self, MeshRecord};
use crate::prelude::*;
use crate::MissingKey;

use serde_json::Value;

/// name given to the mesh when the record has no `mesh_name`
const DEFAULT_MESH_NAME: &str = "FluidMesh";

/// The fixed connectivity of a surface mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    faces: Vec<Vec<usize>>,
    vertex_count: usize,
}

impl Topology {
    /// Validate a raw face list against the number of vertices it indexes
    pub fn new(faces: &[Vec<i64>], vertex_count: usize) -> Result<Self, MeshError> {
        let faces = faces
            .iter()
            .enumerate()
            .map(|(face, indices)| {
                if indices.len() < 3 {
                    return Err(MeshError::DegenerateFace {
                        face,
                        len: indices.len(),
                    });
                }

                indices
                    .iter()
                    .map(|index| {
                        usize::try_from(*index)
                            .ok()
                            .filter(|i| *i < vertex_count)
                            .ok_or(MeshError::FaceIndexOutOfRange {
                                face,
                                index: *index,
                                vertex_count,
                            })
                    })
                    .collect::<Result<Vec<usize>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            faces,
            vertex_count,
        })
    }

    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// number of faces
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// number of vertices every frame of this mesh must have
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// all face indices back to back, as `PolyData` stores them
    pub fn connectivity(&self) -> Vec<i64> {
        self.faces
            .iter()
            .flatten()
            .map(|index| *index as i64)
            .collect()
    }

    /// one past the last connectivity entry of every face
    pub fn offsets(&self) -> Vec<i64> {
        self.faces
            .iter()
            .scan(0i64, |end, face| {
                *end += face.len() as i64;
                Some(*end)
            })
            .collect()
    }
}

/// The topology of a mesh together with its first (reference) frame
#[derive(Debug, Clone)]
pub struct StaticMesh {
    name: String,
    topology: Arc<Topology>,
    reference: MeshFrame,
}

impl StaticMesh {
    /// Read the face list and the first timestep of a mesh record
    pub fn extract(record: &MeshRecord) -> Result<Self, Error> {
        let faces = record
            .static_faces
            .as_ref()
            .ok_or(MissingKey::new("mesh", "static_faces"))?;

        let first = record
            .time_steps
            .first()
            .ok_or(MissingKey::new("mesh", "time_steps"))?;

        let vertices = first
            .vertices
            .as_ref()
            .ok_or(MissingKey::new("mesh", "vertices"))?;

        let points = flatten_vertices(vertices, 0)?;
        let topology = Arc::new(Topology::new(faces, points.len())?);

        let reference = MeshFrame::new(
            0,
            input::frame_or_index(first.frame, 0),
            input::time_or_index(first.time, 0),
            Arc::clone(&topology),
            points,
        )?;

        let name = record
            .mesh_name
            .clone()
            .unwrap_or_else(|| DEFAULT_MESH_NAME.to_string());

        log::debug!(
            "extracted mesh `{}`: {} vertices, {} faces",
            name,
            topology.vertex_count(),
            topology.len()
        );

        Ok(Self {
            name,
            topology,
            reference,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// the frame built from the first timestep
    pub fn reference(&self) -> &MeshFrame {
        &self.reference
    }
}

/// Flatten either a list of points or a list of groups of points into one list of points
pub fn flatten_vertices(vertices: &Value, frame: usize) -> Result<Vec<[f64; 3]>, MeshError> {
    let malformed = |position| MeshError::MalformedVertexGroup { frame, position };

    let entries = vertices.as_array().ok_or(malformed(0))?;
    let mut points = Vec::with_capacity(entries.len());

    for (position, entry) in entries.iter().enumerate() {
        if let Some(point) = as_point(entry) {
            points.push(point);
            continue;
        }

        let group = entry.as_array().ok_or(malformed(position))?;

        for member in group {
            points.push(as_point(member).ok_or(malformed(position))?);
        }
    }

    Ok(points)
}

fn as_point(value: &Value) -> Option<[f64; 3]> {
    match value.as_array()?.as_slice() {
        [x, y, z] => Some([x.as_f64()?, y.as_f64()?, z.as_f64()?]),
        _ => None,
    }
}
