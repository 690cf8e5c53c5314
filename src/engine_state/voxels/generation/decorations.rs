//! Decoration passes run after a chunk's columns are filled.
//!
//! All randomness comes from the chunk's own RNG, consumed in a fixed order,
//! so a chunk decorates identically every time it is generated.

use std::ops::RangeInclusive;

use cgmath::{Point3, Vector3};

use super::biome::Biome;
use super::{ColumnSample, PendingWrite, WriteMode};
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::chunk::Chunk;

/// One in this many chunks attempts a lava pool.
const LAVA_POOL_CHANCE: u32 = 6;
/// Ore veins never reach closer than this to the column surface.
const ORE_SURFACE_CLEARANCE: i32 = 4;
const TREE_ATTEMPTS: RangeInclusive<u32> = 0..=2;
const TRUNK_HEIGHT: RangeInclusive<i32> = 4..=6;
const FLOWER_PATCHES: RangeInclusive<u32> = 1..=3;
const FLOWER_PATCH_RADIUS: i32 = 2;
/// One in this many eligible cells of a patch gets a plant.
const FLOWER_CHANCE: u32 = 4;

pub(super) struct Decorator<'a> {
    chunk: &'a mut Chunk,
    origin: Point3<i32>,
    columns: &'a [ColumnSample],
    rng: fastrand::Rng,
    water_level: i32,
    overflow: Vec<PendingWrite>,
}

impl<'a> Decorator<'a> {
    pub(super) fn new(
        chunk: &'a mut Chunk,
        columns: &'a [ColumnSample],
        rng: fastrand::Rng,
        water_level: i32,
    ) -> Self {
        let origin = chunk.origin();
        Decorator {
            chunk,
            origin,
            columns,
            rng,
            water_level,
            overflow: Vec::new(),
        }
    }

    pub(super) fn finish(self) -> Vec<PendingWrite> {
        self.overflow
    }

    fn column(&self, x: usize, z: usize) -> &ColumnSample {
        &self.columns[x + self.chunk.dimensions().x * z]
    }

    fn world_column(&self, x: usize, z: usize) -> Point3<i32> {
        let height = self.column(x, z).height;
        Point3::new(self.origin.x + x as i32, height, self.origin.z + z as i32)
    }

    /// The block at a world position, if it is inside this chunk.
    fn block_at(&self, world: Point3<i32>) -> Option<BlockType> {
        let local = self.chunk.world_to_local(world)?;
        Some(self.chunk.block_type(local.x, local.y, local.z))
    }

    fn is_solid_ground(&self, world: Point3<i32>) -> bool {
        self.block_at(world)
            .map(|block| {
                let kind = block.kind();
                kind.is_opaque() && !kind.liquid
            })
            .unwrap_or(false)
    }

    /// Writes inside the chunk, or records the write for the world.
    fn place(&mut self, world: Point3<i32>, block_type: BlockType, mode: WriteMode) {
        let write = PendingWrite::new(world, block_type, mode);
        match self.chunk.world_to_local(world) {
            Some(local) => {
                let existing = self.chunk.block_type(local.x, local.y, local.z);
                if write.applies_to(existing) {
                    self.chunk.set_block_type(local.x, local.y, local.z, block_type);
                }
            }
            None => self.overflow.push(write),
        }
    }

    /// Scatters roughly spherical ore veins through stone.
    ///
    /// Each cell within a vein's radius becomes ore with probability falling
    /// off linearly from the center. Veins only replace stone and never leave
    /// the chunk.
    pub(super) fn ore_veins(&mut self, ore: BlockType, count: RangeInclusive<u32>, ceiling: i32) {
        let dims = self.chunk.dimensions();
        let veins = self.rng.u32(count);
        for _ in 0..veins {
            let x = self.rng.usize(0..dims.x);
            let z = self.rng.usize(0..dims.z);
            let top = ceiling.min(self.column(x, z).height - ORE_SURFACE_CLEARANCE);
            if top < 1 {
                continue;
            }
            let center = Point3::new(
                self.origin.x + x as i32,
                self.rng.i32(1..=top),
                self.origin.z + z as i32,
            );
            let radius = 1.2 + self.rng.f32() * 1.6;
            let reach = radius.ceil() as i32;

            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    for dx in -reach..=reach {
                        let distance = ((dx * dx + dy * dy + dz * dz) as f32).sqrt();
                        if distance > radius {
                            continue;
                        }
                        let keep = self.rng.f32() < 1.0 - distance / radius;
                        let cell = center + Vector3::new(dx, dy, dz);
                        if keep && self.block_at(cell) == Some(BlockType::Stone) {
                            self.place(cell, ore, WriteMode::Always);
                        }
                    }
                }
            }
        }
    }

    /// Occasionally pours a 3x3 lava pool onto the surface.
    pub(super) fn lava_pool(&mut self) {
        if self.rng.u32(0..LAVA_POOL_CHANCE) != 0 {
            return;
        }
        let dims = self.chunk.dimensions();
        if dims.x < 3 || dims.z < 3 {
            return;
        }
        let x = self.rng.usize(1..dims.x - 1);
        let z = self.rng.usize(1..dims.z - 1);
        self.try_lava_pool(x, z);
    }

    /// Fills the 3x3 cells one above the surface of column `(x, z)` with lava.
    ///
    /// Every cell must be inside the chunk, non-opaque and not liquid, and
    /// rest on solid ground. Otherwise nothing is placed.
    ///
    /// # Returns
    /// `true` if the pool was placed.
    fn try_lava_pool(&mut self, x: usize, z: usize) -> bool {
        let center = self.world_column(x, z) + Vector3::new(0, 1, 0);
        let open = |block: BlockType| {
            let kind = block.kind();
            !kind.is_opaque() && !kind.liquid
        };

        for dz in -1..=1 {
            for dx in -1..=1 {
                let cell = center + Vector3::new(dx, 0, dz);
                if !self.block_at(cell).is_some_and(open)
                    || !self.is_solid_ground(cell - Vector3::new(0, 1, 0))
                {
                    return false;
                }
            }
        }

        for dz in -1..=1 {
            for dx in -1..=1 {
                let cell = center + Vector3::new(dx, 0, dz);
                self.place(cell, BlockType::Lava, WriteMode::Always);
            }
        }
        true
    }

    /// Grows trees on grass. Trunks overwrite, canopies only fill air, and any
    /// part that crosses the chunk border is carried over.
    pub(super) fn trees(&mut self) {
        let dims = self.chunk.dimensions();
        let attempts = self.rng.u32(TREE_ATTEMPTS);
        for _ in 0..attempts {
            let x = self.rng.usize(0..dims.x);
            let z = self.rng.usize(0..dims.z);
            let trunk_height = self.rng.i32(TRUNK_HEIGHT);
            let ground = self.world_column(x, z);
            if self.column(x, z).biome != Biome::Plains
                || ground.y < self.water_level
                || self.block_at(ground) != Some(BlockType::Grass)
                || self.block_at(ground + Vector3::new(0, 1, 0)) != Some(BlockType::Air)
            {
                continue;
            }

            self.place(ground, BlockType::Dirt, WriteMode::Always);
            for y in 1..=trunk_height {
                self.place(ground + Vector3::new(0, y, 0), BlockType::Log, WriteMode::Always);
            }

            let top = ground.y + trunk_height;
            for y in (top - 2)..=(top + 1) {
                let radius: i32 = if y < top { 2 } else { 1 };
                for dz in -radius..=radius {
                    for dx in -radius..=radius {
                        if dx == 0 && dz == 0 && y <= top {
                            continue;
                        }
                        let corner = dx.abs() == radius && dz.abs() == radius;
                        if corner && (y == top + 1 || self.rng.bool()) {
                            continue;
                        }
                        let leaf = Point3::new(ground.x + dx, y, ground.z + dz);
                        self.place(leaf, BlockType::Leaves, WriteMode::IfAir);
                    }
                }
            }
        }
    }

    /// Scatters plants over grass-topped columns around a few patch centers.
    pub(super) fn flowers(&mut self) {
        let dims = self.chunk.dimensions();
        let patches = self.rng.u32(FLOWER_PATCHES);
        for _ in 0..patches {
            let center_x = self.rng.i32(0..dims.x as i32);
            let center_z = self.rng.i32(0..dims.z as i32);
            for dz in -FLOWER_PATCH_RADIUS..=FLOWER_PATCH_RADIUS {
                for dx in -FLOWER_PATCH_RADIUS..=FLOWER_PATCH_RADIUS {
                    let (x, z) = (center_x + dx, center_z + dz);
                    if x < 0 || z < 0 || x >= dims.x as i32 || z >= dims.z as i32 {
                        continue;
                    }
                    let (x, z) = (x as usize, z as usize);
                    if self.column(x, z).biome != Biome::Plains {
                        continue;
                    }
                    let ground = self.world_column(x, z);
                    let above = ground + Vector3::new(0, 1, 0);
                    if self.block_at(ground) != Some(BlockType::Grass)
                        || self.block_at(above) != Some(BlockType::Air)
                    {
                        continue;
                    }
                    if self.rng.u32(0..FLOWER_CHANCE) != 0 {
                        continue;
                    }
                    let plant = match self.rng.u32(0..3) {
                        0 => BlockType::RedFlower,
                        1 => BlockType::YellowFlower,
                        _ => BlockType::TallGrass,
                    };
                    self.place(above, plant, WriteMode::IfAir);
                }
            }
        }
    }
}
