use super::{flatten_vertices, MeshError, StaticMesh, Topology};
use crate::input::{self, MeshRecord, MeshTimestep};
use crate::prelude::*;

/// The vertex positions of one mesh timestep against the shared topology
#[derive(Debug, Clone, PartialEq)]
pub struct MeshFrame {
    /// position of the timestep in the input list
    pub frame_index: usize,
    /// declared frame number, used for keyframing
    pub frame: i64,
    /// declared simulation time
    pub time: f64,
    topology: Arc<Topology>,
    points: Vec<[f64; 3]>,
}

impl MeshFrame {
    /// Create a frame, checking the point count against the topology
    pub fn new(
        frame_index: usize,
        frame: i64,
        time: f64,
        topology: Arc<Topology>,
        points: Vec<[f64; 3]>,
    ) -> Result<Self, MeshError> {
        let mut mesh_frame = Self {
            frame_index,
            frame,
            time,
            topology,
            points: Vec::new(),
        };

        mesh_frame.replace_points(points)?;
        Ok(mesh_frame)
    }

    /// Swap in a whole new point buffer. The faces are left untouched, so the number of
    /// points may not change.
    pub fn replace_points(&mut self, points: Vec<[f64; 3]>) -> Result<(), MeshError> {
        let expected = self.topology.vertex_count();

        if points.len() != expected {
            return Err(MeshError::VertexCountMismatch {
                frame: self.frame_index,
                expected,
                actual: points.len(),
            });
        }

        self.points = points;
        Ok(())
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// the `PolyData` description of this frame
    pub fn domain(&self) -> PolyDomain<'_> {
        PolyDomain {
            points: &self.points,
            topology: &self.topology,
        }
    }
}

impl StaticMesh {
    /// Build the frame of a single timestep against this mesh's topology
    pub fn build_frame(&self, frame_index: usize, step: &MeshTimestep) -> Result<MeshFrame, MeshError> {
        let vertices = step
            .vertices
            .as_ref()
            .ok_or(MeshError::MissingVertices { frame: frame_index })?;

        let points = flatten_vertices(vertices, frame_index)?;

        MeshFrame::new(
            frame_index,
            input::frame_or_index(step.frame, frame_index),
            input::time_or_index(step.time, frame_index),
            Arc::clone(self.topology()),
            points,
        )
    }

    /// Every frame of `record`, in input order
    pub fn frames<'a>(
        &'a self,
        record: &'a MeshRecord,
    ) -> impl Iterator<Item = Result<MeshFrame, MeshError>> + 'a {
        record
            .time_steps
            .iter()
            .enumerate()
            .map(move |(frame_index, step)| self.build_frame(frame_index, step))
    }
}

/// A borrowed `PolyData` dataset: one polygon per face
#[derive(Debug, Clone, Copy)]
pub struct PolyDomain<'a> {
    points: &'a [[f64; 3]],
    topology: &'a Topology,
}

impl<'a> Domain for PolyDomain<'a> {
    fn dataset_type(&self) -> &'static str {
        "PolyData"
    }

    fn dataset_attributes(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn piece_attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("NumberOfPoints", self.points.len().to_string()),
            ("NumberOfVerts", "0".to_string()),
            ("NumberOfLines", "0".to_string()),
            ("NumberOfStrips", "0".to_string()),
            ("NumberOfPolys", self.topology.len().to_string()),
        ]
    }

    fn write_geometry<W: Write, E: Encode>(
        &self,
        writer: &mut ArrayWriter<W, E>,
    ) -> Result<(), Error> {
        writer.start_element("Points", &[])?;
        writer.write_array("Points", self.points)?;
        writer.end_element("Points")?;

        writer.start_element("Polys", &[])?;
        writer.write_array("connectivity", self.topology.connectivity().as_slice())?;
        writer.write_array("offsets", self.topology.offsets().as_slice())?;
        writer.end_element("Polys")?;

        Ok(())
    }
}
