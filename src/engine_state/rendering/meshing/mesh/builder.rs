//! Visible-face meshing of a single chunk.
//!
//! Every non-air block is visited once. Cube blocks emit one quad per face
//! whose neighbor does not hide it; sprites and torches emit their fixed
//! shapes. Opaque geometry goes to the solid batch, everything else to the
//! transparent batch.
//!
//! Neighbors outside the chunk are read through a [`CellSource`] (normally
//! the world). A neighbor that is not loaded reads as unlit air, so border
//! faces are emitted until the neighbor arrives and marks this chunk dirty.

use cgmath::{EuclideanSpace, Point3, Vector3};
use web_time::Instant;

use super::face::{
    box_face, cube_face, quad_at, LIQUID_SURFACE_HEIGHT, SPRITE_QUADS, TORCH_MAX, TORCH_MIN,
};
use super::mesh::MeshBatch;
use crate::engine_state::rendering::meshing::ChunkMesh;
use crate::engine_state::rendering::texture::TextureAtlas;
use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::block::light::PackedLight;
use crate::engine_state::voxels::block::registry::{animation_phase, BlockKind, MeshStyle};
use crate::engine_state::voxels::block::BlockCell;
use crate::engine_state::voxels::chunk::Chunk;

/// Read access to cells by world position.
pub trait CellSource {
    /// The cell at `world`, or `None` if its chunk is not loaded.
    fn cell_at(&self, world: Point3<i32>) -> Option<BlockCell>;
}

/// A [`CellSource`] with nothing loaded, for meshing a chunk in isolation.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoNeighbors;

impl CellSource for NoNeighbors {
    fn cell_at(&self, _world: Point3<i32>) -> Option<BlockCell> {
        None
    }
}

/// Whether the face between `block` and `neighbor` is drawn on `block`.
///
/// Exactly one of the two being transparent exposes the face; two transparent
/// blocks of different kinds (glass against water) expose each other.
pub fn face_visible(block: &BlockKind, neighbor: &BlockKind) -> bool {
    block.transparent != neighbor.transparent
        || (block.transparent && neighbor.id != block.id)
}

/// Builds [`ChunkMesh`]es.
pub struct ChunkMeshBuilder<'a> {
    neighbors: &'a dyn CellSource,
    atlas: &'a dyn TextureAtlas,
    animation_tick: u64,
}

impl<'a> ChunkMeshBuilder<'a> {
    pub fn new(neighbors: &'a dyn CellSource, atlas: &'a dyn TextureAtlas) -> Self {
        ChunkMeshBuilder {
            neighbors,
            atlas,
            animation_tick: 0,
        }
    }

    /// Selects the tick whose animation phase is baked into animated
    /// textures.
    pub fn with_animation_tick(mut self, tick: u64) -> Self {
        self.animation_tick = tick;
        self
    }

    /// Meshes `chunk` from scratch. Faces come out in build order; the caller
    /// sorts the transparent batch for its viewer.
    pub fn build(&self, chunk: &Chunk) -> ChunkMesh {
        let start = Instant::now();
        let mut mesh = ChunkMesh::default();
        let mut animated = false;
        let origin = chunk.origin();
        let chunk_origin = Vector3::new(origin.x as f32, origin.y as f32, origin.z as f32);

        for (local, cell) in chunk.iter_blocks() {
            let kind = cell.kind();
            let local = Point3::new(local.x as i32, local.y as i32, local.z as i32);
            let base = Point3::new(local.x as f32, local.y as f32, local.z as f32);
            match kind.mesh_style {
                MeshStyle::Sprite => {
                    for corners in SPRITE_QUADS {
                        self.emit(
                            &mut mesh.transparent,
                            kind,
                            BlockSide::FRONT,
                            quad_at(corners, base),
                            cell.light,
                            chunk_origin,
                        );
                    }
                }
                MeshStyle::Torch => {
                    let min = base + Vector3::from(TORCH_MIN);
                    let max = base + Vector3::from(TORCH_MAX);
                    for side in BlockSide::all() {
                        self.emit(
                            &mut mesh.transparent,
                            kind,
                            side,
                            box_face(side, min, max),
                            cell.light,
                            chunk_origin,
                        );
                    }
                }
                MeshStyle::Default => {
                    for side in BlockSide::all() {
                        let neighbor = self.neighbor(chunk, local + side.normal());
                        let neighbor_kind = neighbor.kind();
                        if !face_visible(kind, neighbor_kind) {
                            continue;
                        }
                        let mut corners = cube_face(side, base);
                        if kind.liquid && side == BlockSide::TOP && !neighbor_kind.liquid {
                            for corner in corners.iter_mut() {
                                corner.y = base.y + LIQUID_SURFACE_HEIGHT;
                            }
                        }
                        let batch = if kind.transparent {
                            &mut mesh.transparent
                        } else {
                            &mut mesh.solid
                        };
                        self.emit(batch, kind, side, corners, neighbor.light, chunk_origin);
                        animated |= kind.animated;
                    }
                }
            }
        }

        mesh.animation_phase = animated.then(|| animation_phase(self.animation_tick));

        log::trace!(
            "Meshed chunk {:?}: {} solid / {} transparent faces in {:?}",
            chunk.offset,
            mesh.solid.face_count(),
            mesh.transparent.face_count(),
            start.elapsed()
        );
        mesh
    }

    fn neighbor(&self, chunk: &Chunk, local: Point3<i32>) -> BlockCell {
        if chunk.in_bounds(local) {
            chunk.cell(local.x as usize, local.y as usize, local.z as usize)
        } else {
            self.neighbors
                .cell_at(chunk.origin() + local.to_vec())
                .unwrap_or(BlockCell::AIR)
        }
    }

    fn emit(
        &self,
        batch: &mut MeshBatch,
        kind: &BlockKind,
        side: BlockSide,
        corners: [Point3<f32>; 4],
        light: PackedLight,
        chunk_origin: Vector3<f32>,
    ) {
        let uv = self
            .atlas
            .uv_rect(kind.frame_coord(side, self.animation_tick));
        batch.push_quad(corners, uv, light, chunk_origin);
    }
}
