//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the unit normal each
//! face points along. Face iteration order is fixed and shared with the mesh
//! builder's cube table and the per-face texture arrays of the block registry.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// Each variant is assigned a unique integer value so it can index per-face
/// arrays directly.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// # Returns
    /// An array containing all `BlockSide` variants.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// The outward unit normal of this face, in block units.
    pub fn normal(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }

    /// The face pointing the opposite way.
    pub fn opposite(self) -> BlockSide {
        match self {
            BlockSide::FRONT => BlockSide::BACK,
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::BOTTOM => BlockSide::TOP,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::LEFT => BlockSide::RIGHT,
            BlockSide::RIGHT => BlockSide::LEFT,
        }
    }

    /// Maps a unit normal back to its face.
    ///
    /// # Returns
    /// `None` if `normal` is not one of the six axis-aligned unit vectors.
    pub fn from_normal(normal: Vector3<i32>) -> Option<BlockSide> {
        BlockSide::all()
            .into_iter()
            .find(|side| side.normal() == normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_declaration_order() {
        for (index, side) in BlockSide::all().into_iter().enumerate() {
            assert_eq!(side as usize, index);
        }
    }

    #[test]
    fn test_opposite_normals_cancel() {
        for side in BlockSide::all() {
            assert_eq!(side.normal() + side.opposite().normal(), Vector3::new(0, 0, 0));
            assert_eq!(side.opposite().opposite(), side);
        }
    }

    #[test]
    fn test_from_normal_round_trips() {
        for side in BlockSide::all() {
            assert_eq!(BlockSide::from_normal(side.normal()), Some(side));
        }
        assert_eq!(BlockSide::from_normal(Vector3::new(1, 1, 0)), None);
    }
}
