//! # Surface Meshes
//!
//! A surface mesh in the simulation output moves over time, but its connectivity does not:
//! the face list (`static_faces`) is stored once for the whole run, and every timestep only
//! carries new vertex positions.
//!
//! [`StaticMesh::extract`] reads the face list and the first timestep's vertices and checks
//! every face against the vertex count. The resulting [`Topology`] is immutable and shared
//! (through an `Arc`) by every [`MeshFrame`] built from the following timesteps. A frame
//! never patches the previous one: its point buffer is replaced wholesale, and a
//! vertex count that differs from the reference frame is an error since the faces could
//! no longer index it.
//!
//! ## Vertex layouts
//!
//! Vertices arrive either as a flat list of points or as a list of groups of points:
//!
//! ```json
//! [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]
//! [[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], [[1.0, 1.0, 0.0]]]
//! ```
//!
//! Both flatten to the same ordered sequence of points.
//!
//! ## Writing files
//!
//! [`MeshFrame::domain`] gives a [`PolyDomain`] that can be written as VTK `PolyData` with
//! [write_vtk](`crate::write_vtk()`).

mod extract;
mod frame;

pub use extract::{flatten_vertices, StaticMesh, Topology};
pub use frame::{MeshFrame, PolyDomain};

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum MeshError {
    #[error("face {face} references vertex {index}, the mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        index: i64,
        vertex_count: usize,
    },
    #[error("face {face} has {len} vertices, a face needs at least 3")]
    DegenerateFace { face: usize, len: usize },
    #[error("vertex entry {position} of frame {frame} is neither a point nor a group of points with 3 numeric components")]
    MalformedVertexGroup { frame: usize, position: usize },
    #[error("frame {frame} has {actual} vertices, the mesh topology expects {expected}")]
    VertexCountMismatch {
        frame: usize,
        expected: usize,
        actual: usize,
    },
    #[error("frame {frame} has no vertices")]
    MissingVertices { frame: usize },
}

impl MeshError {
    /// Errors confined to the vertices of a single timestep. Such a frame can be dropped
    /// while the rest of the mesh is still converted; every other error makes the
    /// topology unusable for the whole mesh.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::MalformedVertexGroup { .. } | Self::MissingVertices { .. }
        )
    }
}
