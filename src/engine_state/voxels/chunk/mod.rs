//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a fixed-volume 3D grid of
//! [`BlockCell`]s addressed by local coordinates `[0, size)` on each axis, plus
//! the bookkeeping the world needs to decide when the chunk must be re-meshed.
//!
//! ## Storage Layout
//!
//! Cells live in one contiguous vector in y-major order
//! (`x + size_x * (z + size_z * y)`), so a horizontal layer is contiguous and a
//! column is a fixed stride apart. Two bit vectors mirror the cell data:
//! - `occupied_array`: 1 bit per cell, set for every non-air cell
//! - `opaque_array`: 1 bit per cell, set for every non-transparent cell
//!
//! ### Performance Characteristics
//! - **Cell Lookup**: O(1) index arithmetic
//! - **Opacity Check**: O(1) bit test
//! - **Non-air Iteration**: proportional to the number of set bits

use bitvec::prelude::BitVec;
use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::block::block_side::BlockSide;
use super::block::block_type::BlockType;
use super::block::light::PackedLight;
use super::block::BlockCell;
use crate::engine_state::rendering::meshing::ChunkMesh;

pub mod chunk_iteration;

use chunk_iteration::ChunkBlockIterator;

/// Size of a chunk in blocks along each axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDimensions {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl ChunkDimensions {
    /// The reference layout: 16 wide, 256 tall, 16 deep.
    pub const DEFAULT: ChunkDimensions = ChunkDimensions::new(16, 256, 16);

    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        ChunkDimensions { x, y, z }
    }

    /// The total number of cells in a chunk.
    pub fn volume(&self) -> usize {
        self.x * self.y * self.z
    }

    /// The dimensions as a signed vector, for world-space arithmetic.
    pub fn as_vector(&self) -> Vector3<i32> {
        Vector3::new(self.x as i32, self.y as i32, self.z as i32)
    }

    /// Storage index of a local coordinate. The coordinate must be in bounds.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.x * (z + self.z * y)
    }

    /// Inverse of [`ChunkDimensions::index`].
    #[inline]
    pub fn position(&self, index: usize) -> Point3<usize> {
        let x = index % self.x;
        let z = (index / self.x) % self.z;
        let y = index / (self.x * self.z);
        Point3::new(x, y, z)
    }

    pub fn contains(&self, local: Point3<i32>) -> bool {
        local.x >= 0
            && local.y >= 0
            && local.z >= 0
            && (local.x as usize) < self.x
            && (local.y as usize) < self.y
            && (local.z as usize) < self.z
    }

    /// Splits a world block position into the chunk offset containing it and
    /// the local coordinate within that chunk.
    pub fn split_world_position(&self, world: Point3<i32>) -> (Point3<i32>, Point3<usize>) {
        let size = self.as_vector();
        let offset = Point3::new(
            world.x.div_euclid(size.x),
            world.y.div_euclid(size.y),
            world.z.div_euclid(size.z),
        );
        let local = Point3::new(
            world.x.rem_euclid(size.x) as usize,
            world.y.rem_euclid(size.y) as usize,
            world.z.rem_euclid(size.z) as usize,
        );
        (offset, local)
    }

    /// The chunk offset containing a continuous world position.
    pub fn offset_containing(&self, position: Point3<f32>) -> Point3<i32> {
        Point3::new(
            (position.x / self.x as f32).floor() as i32,
            (position.y / self.y as f32).floor() as i32,
            (position.z / self.z as f32).floor() as i32,
        )
    }

    /// World-space block position of a chunk's local origin.
    pub fn origin_of(&self, offset: Point3<i32>) -> Point3<i32> {
        let size = self.as_vector();
        Point3::new(offset.x * size.x, offset.y * size.y, offset.z * size.z)
    }
}

impl Default for ChunkDimensions {
    fn default() -> Self {
        ChunkDimensions::DEFAULT
    }
}

/// Represents a fixed-size collection of voxel cells in the world.
///
/// Chunks are the unit of generation, meshing and streaming. A chunk is
/// created dirty, so its first mesh is built on the first meshing pass after
/// it is loaded.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub offset: Point3<i32>,

    dimensions: ChunkDimensions,

    cells: Vec<BlockCell>,

    /// One bit per cell, set for non-air cells.
    occupied_array: BitVec,

    /// One bit per cell, set for cells whose block is not transparent.
    opaque_array: BitVec,

    dirty: bool,

    generating: bool,

    /// GPU-side geometry built from this chunk's cells.
    pub mesh: ChunkMesh,
}

impl Chunk {
    /// Creates a new chunk filled with unlit air.
    ///
    /// # Arguments
    /// * `offset` - The chunk coordinates of the new chunk
    /// * `dimensions` - The size of the chunk in blocks
    pub fn new(offset: Point3<i32>, dimensions: ChunkDimensions) -> Self {
        let volume = dimensions.volume();
        assert!(volume > 0, "chunk dimensions must be non-zero: {dimensions:?}");
        Chunk {
            offset,
            dimensions,
            cells: vec![BlockCell::AIR; volume],
            occupied_array: BitVec::repeat(false, volume),
            opaque_array: BitVec::repeat(false, volume),
            dirty: true,
            generating: false,
            mesh: ChunkMesh::default(),
        }
    }

    pub fn dimensions(&self) -> ChunkDimensions {
        self.dimensions
    }

    /// World-space block position of local `(0, 0, 0)`.
    pub fn origin(&self) -> Point3<i32> {
        self.dimensions.origin_of(self.offset)
    }

    fn checked_index(&self, x: usize, y: usize, z: usize) -> usize {
        let dims = self.dimensions;
        assert!(
            x < dims.x && y < dims.y && z < dims.z,
            "local coordinate ({x}, {y}, {z}) is outside chunk bounds {dims:?}"
        );
        dims.index(x, y, z)
    }

    /// Gets the cell at the specified chunk-relative coordinates.
    ///
    /// # Panics
    /// Panics if any coordinate is outside `[0, size)` on its axis.
    pub fn cell(&self, x: usize, y: usize, z: usize) -> BlockCell {
        self.cells[self.checked_index(x, y, z)]
    }

    /// Replaces the cell at the specified chunk-relative coordinates and marks
    /// the chunk dirty.
    ///
    /// # Panics
    /// Panics if any coordinate is outside `[0, size)` on its axis.
    pub fn set_cell(&mut self, x: usize, y: usize, z: usize, cell: BlockCell) {
        let index = self.checked_index(x, y, z);
        self.cells[index] = cell;
        self.occupied_array.set(index, !cell.is_air());
        self.opaque_array.set(index, cell.kind().is_opaque());
        self.dirty = true;
    }

    pub fn block_type(&self, x: usize, y: usize, z: usize) -> BlockType {
        self.cell(x, y, z).block_type
    }

    /// Changes the block in a cell, keeping its light.
    pub fn set_block_type(&mut self, x: usize, y: usize, z: usize, block_type: BlockType) {
        let light = self.cell(x, y, z).light;
        self.set_cell(x, y, z, BlockCell { block_type, light });
    }

    pub fn light(&self, x: usize, y: usize, z: usize) -> PackedLight {
        self.cell(x, y, z).light
    }

    /// Changes the light of a cell, keeping its block. Returns whether the
    /// stored value changed; the chunk is only marked dirty if it did.
    pub fn set_light(&mut self, x: usize, y: usize, z: usize, light: PackedLight) -> bool {
        let index = self.checked_index(x, y, z);
        if self.cells[index].light == light {
            return false;
        }
        self.cells[index].light = light;
        self.dirty = true;
        true
    }

    /// Checks if the cell at the specified coordinates blocks vision.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn is_opaque(&self, x: usize, y: usize, z: usize) -> bool {
        self.opaque_array[self.checked_index(x, y, z)]
    }

    /// `true` iff `local` lies inside `[0, size)` on every axis.
    pub fn in_bounds(&self, local: Point3<i32>) -> bool {
        self.dimensions.contains(local)
    }

    /// `true` iff any coordinate equals 0 or `size - 1` on its axis.
    pub fn on_bounds(&self, local: Point3<i32>) -> bool {
        let max = self.dimensions.as_vector() - Vector3::new(1, 1, 1);
        local.x == 0
            || local.y == 0
            || local.z == 0
            || local.x == max.x
            || local.y == max.y
            || local.z == max.z
    }

    /// The faces of the chunk an in-bounds local coordinate touches.
    ///
    /// A cell in a corner touches up to three faces; an interior cell touches
    /// none.
    pub fn boundary_sides(&self, local: Point3<usize>) -> Vec<BlockSide> {
        let dims = self.dimensions;
        let mut sides = Vec::new();
        if local.x == 0 {
            sides.push(BlockSide::LEFT);
        }
        if local.x + 1 == dims.x {
            sides.push(BlockSide::RIGHT);
        }
        if local.y == 0 {
            sides.push(BlockSide::BOTTOM);
        }
        if local.y + 1 == dims.y {
            sides.push(BlockSide::TOP);
        }
        if local.z == 0 {
            sides.push(BlockSide::BACK);
        }
        if local.z + 1 == dims.z {
            sides.push(BlockSide::FRONT);
        }
        sides
    }

    /// Converts a world block position to a local coordinate of this chunk.
    ///
    /// # Returns
    /// `None` if the position belongs to another chunk.
    pub fn world_to_local(&self, world: Point3<i32>) -> Option<Point3<usize>> {
        let relative = world - self.origin();
        let local = Point3::new(relative.x, relative.y, relative.z);
        self.in_bounds(local)
            .then(|| Point3::new(local.x as usize, local.y as usize, local.z as usize))
    }

    /// The highest local y in column `(x, z)` holding an opaque block.
    pub fn highest_opaque(&self, x: usize, z: usize) -> Option<usize> {
        (0..self.dimensions.y)
            .rev()
            .find(|&y| self.opaque_array[self.dimensions.index(x, y, z)])
    }

    /// `true` if every cell is air.
    pub fn is_empty(&self) -> bool {
        self.occupied_array.not_any()
    }

    /// Iterates the non-air cells of this chunk in storage order.
    pub fn iter_blocks(&self) -> ChunkBlockIterator<'_> {
        ChunkBlockIterator::new(self)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn set_generating(&mut self, generating: bool) {
        self.generating = generating;
    }
}
