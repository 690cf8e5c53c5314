pub mod builder;
pub mod face;
#[allow(clippy::module_inception)]
pub mod mesh;

pub use builder::{face_visible, CellSource, ChunkMeshBuilder, NoNeighbors};
pub use face::MeshFace;
pub use mesh::MeshBatch;
