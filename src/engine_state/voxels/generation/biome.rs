//! Biome classification of terrain columns.

use crate::engine_state::voxels::block::block_type::BlockType;

/// Biome selector value below which a column near the water line is beach.
pub const BEACH_SELECTOR_THRESHOLD: f64 = 0.08;
/// How far from the water level a beach column may sit.
pub const BEACH_HEIGHT_TOLERANCE: i32 = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    Ocean,
    Beach,
    Plains,
}

impl Biome {
    /// Classifies a column from its surface height and biome selector.
    ///
    /// # Arguments
    /// * `height` - Absolute surface height of the column
    /// * `selector` - Normalized biome selector noise
    /// * `water_level` - Absolute water level of the world
    pub fn classify(height: i32, selector: f64, water_level: i32) -> Self {
        if height < water_level {
            Biome::Ocean
        } else if selector < BEACH_SELECTOR_THRESHOLD
            && (height - water_level).abs() <= BEACH_HEIGHT_TOLERANCE
        {
            Biome::Beach
        } else {
            Biome::Plains
        }
    }

    /// The block placed at the column's surface height.
    pub fn surface_block(self) -> BlockType {
        match self {
            Biome::Ocean | Biome::Beach => BlockType::Sand,
            Biome::Plains => BlockType::Grass,
        }
    }

    /// The block placed in the layers just below the surface.
    pub fn filler_block(self) -> BlockType {
        match self {
            Biome::Ocean | Biome::Plains => BlockType::Dirt,
            Biome::Beach => BlockType::Sand,
        }
    }
}
