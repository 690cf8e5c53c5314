//! Meshing renderer module for the voxel engine.
//!
//! This module turns the uploaded chunk meshes into the per-frame draw list the
//! external renderer executes.
//!
//! # Draw Order Contract
//!
//! 1. Solid draws, in any order, with depth writes.
//! 2. Transparent draws, farthest chunk first. Each transparent index buffer is
//!    already sorted back to front inside its chunk.

use cgmath::{Matrix4, MetricSpace, Point3, Vector3};

use crate::engine_state::buffer_state::BufferHandle;
use crate::engine_state::voxels::chunk::Chunk;

/// One indexed draw of an uploaded batch.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawCommand {
    pub chunk_offset: Point3<i32>,
    pub buffers: BufferHandle,
    pub index_count: u32,
    /// Translation by the chunk origin.
    pub model: Matrix4<f32>,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderList {
    pub solid: Vec<DrawCommand>,
    /// Sorted farthest chunk first.
    pub transparent: Vec<DrawCommand>,
    pub wireframe: bool,
}

impl RenderList {
    /// Collects the draws of every uploaded batch of `chunks`.
    ///
    /// # Arguments
    /// * `chunks` - The loaded chunks
    /// * `viewer` - World position transparent chunks are ordered against
    /// * `wireframe` - Whether the renderer should draw edges only
    pub fn collect<'a>(
        chunks: impl IntoIterator<Item = &'a Chunk>,
        viewer: Point3<f32>,
        wireframe: bool,
    ) -> Self {
        let mut list = RenderList {
            wireframe,
            ..Default::default()
        };
        let mut transparent = Vec::new();

        for chunk in chunks {
            let origin = chunk.origin();
            let translation = Vector3::new(origin.x as f32, origin.y as f32, origin.z as f32);
            let model = Matrix4::from_translation(translation);

            if let Some(handle) = chunk.mesh.solid.handle {
                list.solid.push(DrawCommand {
                    chunk_offset: chunk.offset,
                    buffers: handle,
                    index_count: chunk.mesh.solid.index_count,
                    model,
                });
            }
            if let Some(handle) = chunk.mesh.transparent.handle {
                let size = chunk.dimensions().as_vector();
                let center = Point3::new(
                    translation.x + size.x as f32 / 2.0,
                    translation.y + size.y as f32 / 2.0,
                    translation.z + size.z as f32 / 2.0,
                );
                let command = DrawCommand {
                    chunk_offset: chunk.offset,
                    buffers: handle,
                    index_count: chunk.mesh.transparent.index_count,
                    model,
                };
                transparent.push((center.distance2(viewer), command));
            }
        }

        transparent.sort_by(|(a, _), (b, _)| b.total_cmp(a));
        list.transparent = transparent.into_iter().map(|(_, command)| command).collect();
        list
    }

    pub fn draw_count(&self) -> usize {
        self.solid.len() + self.transparent.len()
    }
}
