//! # Block Type Module
//!
//! This module defines the identifiers of every block kind in the voxel world,
//! the conversion from the compact storage integer, and the name lookup used by
//! configuration files.

use num_derive::FromPrimitive;
use phf::phf_map;

use super::BlockTypeSize;

/// Enumerates all block kinds in the voxel world.
///
/// The discriminant doubles as the index into the block registry table, so
/// variants must stay in the same order as that table. The `FromPrimitive`
/// derive allows conversion from the stored integer.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
pub enum BlockType {
    /// Empty space. Transparent and never meshed.
    #[default]
    Air = 0,
    Stone,
    Dirt,
    /// Grass top over a dirt body.
    Grass,
    Sand,
    /// Animated liquid, drawn with a lowered surface.
    Water,
    Glass,
    Leaves,
    Log,
    Planks,
    CoalOre,
    CopperOre,
    /// Animated, light-emitting liquid.
    Lava,
    RedFlower,
    YellowFlower,
    TallGrass,
    Torch,
    Bedrock,
}

/// Lookup from the lowercase block name to its identifier.
static BLOCK_NAMES: phf::Map<&'static str, BlockType> = phf_map! {
    "air" => BlockType::Air,
    "stone" => BlockType::Stone,
    "dirt" => BlockType::Dirt,
    "grass" => BlockType::Grass,
    "sand" => BlockType::Sand,
    "water" => BlockType::Water,
    "glass" => BlockType::Glass,
    "leaves" => BlockType::Leaves,
    "log" => BlockType::Log,
    "planks" => BlockType::Planks,
    "coal_ore" => BlockType::CoalOre,
    "copper_ore" => BlockType::CopperOre,
    "lava" => BlockType::Lava,
    "red_flower" => BlockType::RedFlower,
    "yellow_flower" => BlockType::YellowFlower,
    "tall_grass" => BlockType::TallGrass,
    "torch" => BlockType::Torch,
    "bedrock" => BlockType::Bedrock,
};

impl BlockType {
    /// The number of block kinds.
    pub const COUNT: usize = BlockType::Bedrock as usize + 1;

    /// Converts a `BlockTypeSize` to a `BlockType`.
    ///
    /// # Arguments
    /// * `btype` - The block type as a `BlockTypeSize`
    ///
    /// # Returns
    /// The corresponding `BlockType`
    ///
    /// # Panics
    /// Panics if the input value doesn't correspond to a valid `BlockType`.
    pub fn get_block_type_from_int(btype: BlockTypeSize) -> Self {
        match <Self as num_traits::FromPrimitive>::from_u8(btype) {
            Some(block_type) => block_type,
            None => panic!("block id {btype} is out of range (0..{})", Self::COUNT),
        }
    }

    /// Resolves a block by its configuration name, e.g. `"coal_ore"`.
    pub fn from_name(name: &str) -> Option<Self> {
        BLOCK_NAMES.get(name).copied()
    }

    /// The compact storage form of this identifier.
    pub fn as_int(self) -> BlockTypeSize {
        self as BlockTypeSize
    }
}
