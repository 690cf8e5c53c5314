//! # Heightmap Module
//!
//! One heightmap per XZ chunk column records, for each block column, the world
//! y of the highest non-transparent block. A recorded height is never below
//! the true highest opaque block; columns nothing is known about hold
//! [`UNKNOWN_HEIGHT`].

use serde::{Deserialize, Serialize};

/// Marker for a column whose height has not been observed.
pub const UNKNOWN_HEIGHT: i32 = i32::MIN;

/// Highest-opaque-block table for one chunk column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heightmap {
    width: usize,
    depth: usize,
    heights: Vec<i32>,
}

impl Heightmap {
    /// Creates a heightmap with every column unknown.
    pub fn new(width: usize, depth: usize) -> Self {
        Heightmap {
            width,
            depth,
            heights: vec![UNKNOWN_HEIGHT; width * depth],
        }
    }

    fn index(&self, x: usize, z: usize) -> usize {
        assert!(
            x < self.width && z < self.depth,
            "heightmap column ({x}, {z}) is outside {}x{}",
            self.width,
            self.depth
        );
        x + self.width * z
    }

    /// The recorded height of column `(x, z)`, possibly [`UNKNOWN_HEIGHT`].
    pub fn get(&self, x: usize, z: usize) -> i32 {
        self.heights[self.index(x, z)]
    }

    /// The recorded height, or `None` if unknown.
    pub fn known(&self, x: usize, z: usize) -> Option<i32> {
        let height = self.get(x, z);
        (height != UNKNOWN_HEIGHT).then_some(height)
    }

    pub fn set(&mut self, x: usize, z: usize, height: i32) {
        let index = self.index(x, z);
        self.heights[index] = height;
    }

    /// Records `y` if it is above the current value (or the column is unknown).
    ///
    /// # Returns
    /// The previous height if it changed.
    pub fn raise(&mut self, x: usize, z: usize, y: i32) -> Option<i32> {
        let index = self.index(x, z);
        let previous = self.heights[index];
        if previous == UNKNOWN_HEIGHT || y > previous {
            self.heights[index] = y;
            Some(previous)
        } else {
            None
        }
    }

    /// Whether a block at world height `y` sits above the recorded surface.
    pub fn is_exposed(&self, x: usize, z: usize, y: i32) -> bool {
        y > self.get(x, z)
    }
}
