//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel engine.
//! It includes block identifiers, the block kind registry, face handling, packed
//! light and the per-cell data stored in chunks.

use block_type::BlockType;
use light::PackedLight;
use registry::BlockKind;

pub mod block_side;
pub mod block_type;
pub mod light;
pub mod registry;

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;

/// A single voxel cell: which block occupies it and how it is lit.
///
/// The position is implied by the cell's index in its chunk. The default
/// cell is air with zero light.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockCell {
    pub block_type: BlockType,
    pub light: PackedLight,
}

impl BlockCell {
    pub const AIR: BlockCell = BlockCell {
        block_type: BlockType::Air,
        light: PackedLight::ZERO,
    };

    /// Creates an unlit cell of the specified type.
    ///
    /// # Arguments
    /// * `block_type` - The type of block to create
    ///
    /// # Returns
    /// A new `BlockCell` with zero light.
    pub fn new(block_type: BlockType) -> Self {
        BlockCell {
            block_type,
            light: PackedLight::ZERO,
        }
    }

    /// The registry record for this cell's block.
    pub fn kind(&self) -> &'static BlockKind {
        registry::get(self.block_type)
    }

    pub fn is_air(&self) -> bool {
        self.block_type == BlockType::Air
    }
}
