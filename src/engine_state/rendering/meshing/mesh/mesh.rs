//! Mesh data structures and operations for voxel rendering.
//!
//! A [`MeshBatch`] is the CPU-side form of one draw: a vertex list and the
//! faces (index runs) that reference it. Faces keep their world-space centers
//! so transparent batches can be re-ordered back to front without touching
//! the vertices.

use cgmath::{MetricSpace, Point3, Vector3};

use super::face::{MeshFace, QuadCorners, QUAD_UVS};
use crate::engine_state::buffer_state::BufferHandle;
use crate::engine_state::rendering::texture::UvRect;
use crate::engine_state::rendering::Vertex;
use crate::engine_state::voxels::block::light::PackedLight;

/// Vertices and faces of one batch, plus its upload state.
#[derive(Debug, Default)]
pub struct MeshBatch {
    /// The vertex data for this batch
    pub vertices: Vec<Vertex>,
    /// One entry per quad, in draw order
    pub faces: Vec<MeshFace>,
    /// Buffers holding the uploaded data, if anything was uploaded
    pub handle: Option<BufferHandle>,
    /// Number of indices in the uploaded index buffer
    pub index_count: u32,
    /// Whether `faces` survived the last upload
    pub face_list_persisted: bool,
}

impl MeshBatch {
    /// Appends a quad.
    ///
    /// # Arguments
    /// * `corners` - Chunk-local corners in [`QuadCorners`] order
    /// * `uv` - Atlas rectangle of the face texture
    /// * `light` - Light written into all four vertices
    /// * `chunk_origin` - World position of the chunk, for the face center
    pub fn push_quad(
        &mut self,
        corners: QuadCorners,
        uv: UvRect,
        light: PackedLight,
        chunk_origin: Vector3<f32>,
    ) {
        let first_vertex = self.vertices.len() as u32;
        for (corner, [u, v]) in corners.iter().zip(QUAD_UVS) {
            self.vertices
                .push(Vertex::new(*corner, uv.lerp(u, v), light.raw()));
        }
        let center = MeshFace::quad_center(&corners) + chunk_origin;
        self.faces.push(MeshFace::new(first_vertex, center));
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// `true` if the batch holds no faces.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Orders faces by descending squared distance from `viewer`.
    ///
    /// The sort is stable, so faces at equal distance keep their build order.
    pub fn sort_back_to_front(&mut self, viewer: Point3<f32>) {
        self.faces.sort_by(|a, b| {
            let distance_a = a.center.distance2(viewer);
            let distance_b = b.center.distance2(viewer);
            distance_b.total_cmp(&distance_a)
        });
    }

    /// The index buffer for the current face order.
    pub fn indices(&self) -> Vec<u32> {
        self.faces.iter().flat_map(|face| face.indices).collect()
    }

    /// Drops the CPU-side geometry.
    pub fn clear(&mut self) {
        self.vertices = Vec::new();
        self.faces = Vec::new();
    }
}
