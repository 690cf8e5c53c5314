//! Rendering-side data for the voxel engine.
//!
//! This module owns everything between chunk cells and the external renderer:
//! the vertex format, texture atlas addressing, chunk mesh building and the
//! per-frame draw list. No graphics API is called from here; uploads go
//! through [`crate::engine_state::buffer_state::GpuBuffers`].

pub mod meshing;
pub mod texture;
pub mod vertex;

// Re-export commonly used types
pub use meshing::{ChunkMesh, DrawCommand, RenderList};
pub use texture::{GridAtlas, TextureAtlas, UvRect};
pub use vertex::Vertex;
