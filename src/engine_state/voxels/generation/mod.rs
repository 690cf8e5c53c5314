//! # World Generation
//!
//! Procedural terrain for freshly created chunks.
//!
//! ## Pipeline
//!
//! For every XZ column of a chunk the generator samples a [`ColumnSample`]:
//! two warped height candidates, a biome selector that picks between them, the
//! resulting absolute surface height, the biome and a filler depth. Columns
//! are filled bottom to top (bedrock, stone, filler, surface, water up to the
//! water level). Decorations then run from a per-chunk RNG: ore veins, lava
//! pools, trees and flowers.
//!
//! ## Cross-Chunk Writes
//!
//! Trees may straddle chunk borders. Writes that land outside the chunk being
//! generated are returned as [`PendingWrite`]s and the world routes them to the
//! neighboring chunk, or queues them until that chunk is generated.
//!
//! ## Determinism
//!
//! Everything is a pure function of `(seed, offset)`: the noise has no state
//! and the decoration RNG is seeded from the seed folded with the offset.

use cgmath::Point3;
use web_time::Instant;

use super::block::block_type::BlockType;
use super::chunk::{Chunk, ChunkDimensions};
use super::noise::{ColumnNoise, CombinedNoise, OctaveNoise};
use biome::Biome;
use decorations::Decorator;

pub mod biome;
mod decorations;

/// Horizontal stretch applied to the height noises.
const HEIGHT_NOISE_SCALE: f64 = 1.3;

/// How a queued write treats the block already in place.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WriteMode {
    /// Replace whatever is there.
    Always,
    /// Only fill air, so canopies never overwrite terrain or trunks.
    IfAir,
}

/// A block write addressed in world coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingWrite {
    pub position: Point3<i32>,
    pub block_type: BlockType,
    pub mode: WriteMode,
}

impl PendingWrite {
    pub fn new(position: Point3<i32>, block_type: BlockType, mode: WriteMode) -> Self {
        PendingWrite {
            position,
            block_type,
            mode,
        }
    }

    /// Whether this write replaces a cell currently holding `existing`.
    pub fn applies_to(&self, existing: BlockType) -> bool {
        match self.mode {
            WriteMode::Always => true,
            WriteMode::IfAir => existing == BlockType::Air,
        }
    }
}

/// Terrain parameters of one world column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColumnSample {
    /// Absolute y of the surface block.
    pub height: i32,
    /// Normalized biome selector noise.
    pub selector: f64,
    pub biome: Biome,
    /// Number of filler layers below the surface block.
    pub filler_depth: i32,
}

type HeightNoise = CombinedNoise<OctaveNoise, OctaveNoise>;

/// Generates terrain for chunks of one world.
///
/// Shared between threads behind an `Arc`; generation needs only `&self`.
pub struct WorldGenerator {
    seed: i32,
    water_level: i32,
    dimensions: ChunkDimensions,
    height_low: HeightNoise,
    height_high: HeightNoise,
    biome_selector: OctaveNoise,
    filler_depth: OctaveNoise,
}

impl WorldGenerator {
    pub fn new(seed: i32, water_level: i32, dimensions: ChunkDimensions) -> Self {
        WorldGenerator {
            seed,
            water_level,
            dimensions,
            height_low: CombinedNoise::new(OctaveNoise::new(8, 1), OctaveNoise::new(8, 2)),
            height_high: CombinedNoise::new(OctaveNoise::new(8, 3), OctaveNoise::new(8, 4)),
            biome_selector: OctaveNoise::new(6, 0),
            filler_depth: OctaveNoise::new(4, 5),
        }
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn water_level(&self) -> i32 {
        self.water_level
    }

    pub fn dimensions(&self) -> ChunkDimensions {
        self.dimensions
    }

    /// Samples the terrain parameters of the world column `(x, z)`.
    pub fn sample_column(&self, x: i32, z: i32) -> ColumnSample {
        let (x, z) = (x as f64, z as f64);
        let (hx, hz) = (x * HEIGHT_NOISE_SCALE, z * HEIGHT_NOISE_SCALE);

        let low = self.height_low.compute(self.seed, hx, hz) / 6.0 - 4.0;
        let high = self.height_high.compute(self.seed, hx, hz) / 5.0 + 6.0;
        let selector = self.biome_selector.compute(self.seed, x, z) / 8.0;

        let mut relief = (if selector > 0.0 { low } else { low.max(high) }) / 2.0;
        if relief < 0.0 {
            relief *= 0.8;
        }
        let height = (self.water_level + relief.floor() as i32).max(1);

        let filler_noise = (self.filler_depth.compute(self.seed, x, z) / 24.0).clamp(-1.0, 1.0);
        let filler_depth = (3.5 + filler_noise * 1.5) as i32;

        ColumnSample {
            height,
            selector,
            biome: Biome::classify(height, selector, self.water_level),
            filler_depth,
        }
    }

    /// The block a column holds at world height `y`, before decorations.
    pub fn column_block(&self, column: &ColumnSample, y: i32) -> BlockType {
        if y < 0 {
            BlockType::Air
        } else if y == 0 {
            BlockType::Bedrock
        } else if y > column.height {
            if y < self.water_level {
                BlockType::Water
            } else {
                BlockType::Air
            }
        } else if y == column.height {
            column.biome.surface_block()
        } else if y > column.height - column.filler_depth {
            column.biome.filler_block()
        } else {
            BlockType::Stone
        }
    }

    /// Fills every cell of a fresh chunk.
    ///
    /// # Arguments
    /// * `chunk` - An all-air chunk with this generator's dimensions
    ///
    /// # Returns
    /// Decoration writes that fell outside the chunk, in world coordinates.
    pub fn generate(&self, chunk: &mut Chunk) -> Vec<PendingWrite> {
        debug_assert_eq!(chunk.dimensions(), self.dimensions);
        let start = Instant::now();
        let dims = self.dimensions;
        let origin = chunk.origin();

        let mut columns = Vec::with_capacity(dims.x * dims.z);
        for z in 0..dims.z {
            for x in 0..dims.x {
                columns.push(self.sample_column(origin.x + x as i32, origin.z + z as i32));
            }
        }

        for z in 0..dims.z {
            for x in 0..dims.x {
                let column = &columns[x + dims.x * z];
                for y in 0..dims.y {
                    let block = self.column_block(column, origin.y + y as i32);
                    if block != BlockType::Air {
                        chunk.set_block_type(x, y, z, block);
                    }
                }
            }
        }

        let rng = fastrand::Rng::with_seed(chunk_seed(self.seed, chunk.offset));
        let mut decorator = Decorator::new(chunk, &columns, rng, self.water_level);
        decorator.ore_veins(BlockType::CoalOre, 3..=6, i32::MAX);
        decorator.ore_veins(BlockType::CopperOre, 1..=3, self.water_level - 12);
        decorator.lava_pool();
        decorator.trees();
        decorator.flowers();
        let overflow = decorator.finish();

        log::debug!(
            "Generated chunk {:?} in {:?} ({} carry-over writes)",
            chunk.offset,
            start.elapsed(),
            overflow.len()
        );
        overflow
    }
}

/// Folds a chunk offset into the world seed.
pub fn chunk_seed(seed: i32, offset: Point3<i32>) -> u64 {
    let fold = (offset.x as u32 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (offset.y as u32 as u64)
            .wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            .rotate_left(21)
        ^ (offset.z as u32 as u64)
            .wrapping_mul(0x1656_67B1_9E37_79F9)
            .rotate_left(42);
    (seed as u32 as u64) ^ fold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> WorldGenerator {
        WorldGenerator::new(20134, 64, ChunkDimensions::new(16, 128, 16))
    }

    #[test]
    fn test_column_fill_layers() {
        let generator = generator();
        let column = ColumnSample {
            height: 60,
            selector: 0.5,
            biome: Biome::Ocean,
            filler_depth: 3,
        };
        assert_eq!(generator.column_block(&column, -1), BlockType::Air);
        assert_eq!(generator.column_block(&column, 0), BlockType::Bedrock);
        assert_eq!(generator.column_block(&column, 57), BlockType::Stone);
        assert_eq!(generator.column_block(&column, 58), BlockType::Dirt);
        assert_eq!(generator.column_block(&column, 60), BlockType::Sand);
        assert_eq!(generator.column_block(&column, 61), BlockType::Water);
        assert_eq!(generator.column_block(&column, 63), BlockType::Water);
        assert_eq!(generator.column_block(&column, 64), BlockType::Air);
    }

    #[test]
    fn test_samples_are_consistent() {
        let generator = generator();
        for (x, z) in [(0, 0), (15, -3), (-100, 250), (4000, 4000)] {
            let sample = generator.sample_column(x, z);
            assert_eq!(sample, generator.sample_column(x, z));
            assert_eq!(
                sample.biome,
                Biome::classify(sample.height, sample.selector, generator.water_level())
            );
            assert!((2..=5).contains(&sample.filler_depth));
            assert!(sample.height >= 1);
        }
    }

    #[test]
    fn test_chunk_seed_differs_per_offset() {
        let a = chunk_seed(20134, Point3::new(0, 0, 0));
        let b = chunk_seed(20134, Point3::new(1, 0, 0));
        let c = chunk_seed(20134, Point3::new(0, 0, 1));
        let d = chunk_seed(20135, Point3::new(0, 0, 0));
        assert!(a != b && a != c && b != c && a != d);
    }

    #[test]
    fn test_generate_is_deterministic() {
        let generator = generator();
        let offset = Point3::new(2, 0, -1);
        let mut first = Chunk::new(offset, generator.dimensions());
        let mut second = Chunk::new(offset, generator.dimensions());
        let spill_a = generator.generate(&mut first);
        let spill_b = generator.generate(&mut second);
        assert_eq!(spill_a, spill_b);
        assert!(first.iter_blocks().eq(second.iter_blocks()));
    }

    #[test]
    fn test_spill_lands_outside_the_chunk() {
        let generator = generator();
        for x in -3..3 {
            let mut chunk = Chunk::new(Point3::new(x, 0, 0), generator.dimensions());
            for write in generator.generate(&mut chunk) {
                assert!(chunk.world_to_local(write.position).is_none());
            }
        }
    }

    #[test]
    fn test_applies_to() {
        let always = PendingWrite::new(Point3::new(0, 0, 0), BlockType::Log, WriteMode::Always);
        let if_air = PendingWrite::new(Point3::new(0, 0, 0), BlockType::Leaves, WriteMode::IfAir);
        assert!(always.applies_to(BlockType::Stone));
        assert!(if_air.applies_to(BlockType::Air));
        assert!(!if_air.applies_to(BlockType::Log));
    }
}
