//! Mesh generation and management for voxel rendering.
//!
//! This module handles the conversion of chunk cells into GPU-ready meshes and
//! the life cycle of the uploaded buffers.
//!
//! # Architecture
//! - `ChunkMesh`: the solid and transparent batches owned by a chunk
//! - `mesh/`: face geometry, batches and the visible-face builder
//! - `renderer`: the per-frame draw list handed to the external renderer
//!
//! # Transparency
//! Transparent faces are drawn back to front. Each transparent batch is sorted
//! against the viewer when it is built; when the viewer later moves far
//! enough, a batch whose face list was persisted is re-sorted and only its
//! index buffer is rewritten. A batch without a persisted face list has to be
//! rebuilt instead.

use cgmath::{MetricSpace, Point3};

use crate::engine_state::buffer_state::{BufferHandle, GpuBuffers};

pub mod mesh;
mod renderer;

pub use mesh::*;
pub use renderer::*;

/// What a re-sort request did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResortOutcome {
    /// The index buffer was rewritten in the new order.
    Resorted,
    /// The face list was dropped after upload; the chunk must be rebuilt.
    NeedsRebuild,
    /// There is no uploaded transparent geometry to sort.
    NothingToSort,
}

/// The two batches of a chunk.
#[derive(Debug, Default)]
pub struct ChunkMesh {
    pub solid: MeshBatch,
    pub transparent: MeshBatch,
    /// Viewer position the transparent batch was last sorted for.
    sorted_from: Option<Point3<f32>>,
    /// Animation phase baked into the mesh; `None` without animated faces.
    pub(super) animation_phase: Option<u64>,
}

impl ChunkMesh {
    pub fn sorted_from(&self) -> Option<Point3<f32>> {
        self.sorted_from
    }

    pub fn animation_phase(&self) -> Option<u64> {
        self.animation_phase
    }

    /// Whether the mesh shows animated faces from a phase other than `phase`.
    pub fn is_animation_stale(&self, phase: u64) -> bool {
        self.animation_phase.is_some_and(|built| built != phase)
    }

    /// Sorts the transparent faces for `viewer` without uploading.
    pub fn sort_transparent(&mut self, viewer: Point3<f32>) {
        self.transparent.sort_back_to_front(viewer);
        self.sorted_from = Some(viewer);
    }

    /// Uploads both batches, skipping empty ones.
    ///
    /// # Arguments
    /// * `buffers` - The GPU buffer backend
    /// * `label` - Debug label prefix for the uploads
    /// * `persist_faces` - Keep the CPU face lists so later re-sorts only
    ///   rewrite indices
    pub fn upload(&mut self, buffers: &mut dyn GpuBuffers, label: &str, persist_faces: bool) {
        for (batch, kind) in [(&mut self.solid, "solid"), (&mut self.transparent, "transparent")] {
            if let Some(handle) = batch.handle.take() {
                buffers.release(handle);
            }
            batch.index_count = 0;
            if !batch.is_empty() {
                let indices = batch.indices();
                batch.index_count = indices.len() as u32;
                batch.handle =
                    Some(buffers.upload_mesh(&format!("{label} {kind}"), &batch.vertices, &indices));
            }
            batch.face_list_persisted = persist_faces;
            if !persist_faces {
                batch.clear();
            }
        }
    }

    /// Re-orders the uploaded transparent batch for a new viewer position.
    pub fn resort(&mut self, viewer: Point3<f32>, buffers: &mut dyn GpuBuffers) -> ResortOutcome {
        let Some(handle) = self.transparent.handle else {
            return ResortOutcome::NothingToSort;
        };
        if !self.transparent.face_list_persisted {
            return ResortOutcome::NeedsRebuild;
        }
        self.sort_transparent(viewer);
        buffers.write_indices(handle, &self.transparent.indices());
        ResortOutcome::Resorted
    }

    /// Whether the transparent batch was sorted for a viewer more than
    /// `threshold` away from `viewer`.
    pub fn needs_resort(&self, viewer: Point3<f32>, threshold: f32) -> bool {
        self.transparent.handle.is_some()
            && self
                .sorted_from
                .map_or(true, |from| from.distance2(viewer) > threshold * threshold)
    }

    /// Takes the handles of both batches, leaving the mesh without uploads.
    pub fn take_handles(&mut self) -> Vec<BufferHandle> {
        [self.solid.handle.take(), self.transparent.handle.take()]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Releases both uploads.
    pub fn release(&mut self, buffers: &mut dyn GpuBuffers) {
        for handle in self.take_handles() {
            buffers.release(handle);
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.solid.handle.is_some() || self.transparent.handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::engine_state::buffer_state::HostBuffers;
    use crate::engine_state::rendering::texture::GridAtlas;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::chunk::{Chunk, ChunkDimensions};

    fn glass_row() -> ChunkMesh {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0), ChunkDimensions::new(8, 8, 8));
        for x in [1, 3, 5] {
            chunk.set_block_type(x, 1, 1, BlockType::Glass);
        }
        chunk.set_block_type(1, 5, 1, BlockType::Stone);
        let atlas = GridAtlas::default();
        ChunkMeshBuilder::new(&NoNeighbors, &atlas).build(&chunk)
    }

    #[test]
    fn test_upload_skips_empty_batches() {
        let mut mesh = ChunkMesh::default();
        let mut buffers = HostBuffers::new();
        mesh.upload(&mut buffers, "empty", true);
        assert!(!mesh.is_uploaded());
        assert_eq!(buffers.live_buffer_count(), 0);
    }

    #[test]
    fn test_resort_with_persisted_faces_rewrites_indices() {
        let mut mesh = glass_row();
        let mut buffers = HostBuffers::new();
        mesh.sort_transparent(Point3::new(-10.0, 1.5, 1.5));
        mesh.upload(&mut buffers, "chunk", true);
        let handle = mesh.transparent.handle.expect("transparent upload");
        let before = buffers.indices(handle).to_vec();

        assert!(mesh.needs_resort(Point3::new(20.0, 1.5, 1.5), 4.0));
        assert_eq!(
            mesh.resort(Point3::new(20.0, 1.5, 1.5), &mut buffers),
            ResortOutcome::Resorted
        );
        assert_ne!(buffers.indices(handle), &before[..]);
        assert_eq!(buffers.analytics(handle).times_written, 2);
        assert!(!mesh.needs_resort(Point3::new(21.0, 1.5, 1.5), 4.0));
    }

    #[test]
    fn test_resort_without_persisted_faces_needs_rebuild() {
        let mut mesh = glass_row();
        let mut buffers = HostBuffers::new();
        mesh.upload(&mut buffers, "chunk", false);
        assert!(mesh.transparent.faces.is_empty());
        assert_eq!(mesh.transparent.index_count, 18 * 6);
        assert_eq!(
            mesh.resort(Point3::new(0.0, 0.0, 0.0), &mut buffers),
            ResortOutcome::NeedsRebuild
        );
    }

    #[test]
    fn test_upload_replaces_and_release_frees() {
        let mut mesh = glass_row();
        let mut buffers = HostBuffers::new();
        mesh.upload(&mut buffers, "chunk", true);
        assert_eq!(buffers.live_buffer_count(), 2);
        mesh.upload(&mut buffers, "chunk", true);
        assert_eq!(buffers.live_buffer_count(), 2);
        mesh.release(&mut buffers);
        assert_eq!(buffers.live_buffer_count(), 0);
        assert!(!mesh.is_uploaded());
    }
}
