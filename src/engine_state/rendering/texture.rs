//! Texture atlas addressing for the rendering pipeline.
//!
//! The mesh builder never touches image data. It asks a [`TextureAtlas`] to
//! translate a block face's atlas coordinate into the UV rectangle the
//! renderer samples.

use crate::engine_state::voxels::block::registry::AtlasCoord;

/// A rectangle in normalized atlas space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UvRect {
    pub u_min: f32,
    pub v_min: f32,
    pub u_max: f32,
    pub v_max: f32,
}

impl UvRect {
    /// UV of a point given in `[0, 1]` face space, `v` growing downward.
    pub fn lerp(&self, u: f32, v: f32) -> [f32; 2] {
        [
            self.u_min + (self.u_max - self.u_min) * u,
            self.v_min + (self.v_max - self.v_min) * v,
        ]
    }
}

/// Maps atlas coordinates to UV rectangles.
pub trait TextureAtlas {
    fn uv_rect(&self, coord: AtlasCoord) -> UvRect;
}

/// An atlas of equally sized square tiles, numbered row by row.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridAtlas {
    tiles_per_row: u16,
    tiles_per_column: u16,
    /// Shrinks each tile by this fraction of a tile on every edge, against
    /// bleeding from neighboring tiles under filtering.
    inset: f32,
}

impl GridAtlas {
    pub fn new(tiles_per_row: u16, tiles_per_column: u16) -> Self {
        assert!(tiles_per_row > 0 && tiles_per_column > 0, "atlas must have tiles");
        GridAtlas {
            tiles_per_row,
            tiles_per_column,
            inset: 0.0,
        }
    }

    pub fn with_inset(mut self, inset: f32) -> Self {
        self.inset = inset;
        self
    }
}

impl Default for GridAtlas {
    fn default() -> Self {
        GridAtlas::new(16, 16)
    }
}

impl TextureAtlas for GridAtlas {
    fn uv_rect(&self, coord: AtlasCoord) -> UvRect {
        let column = (coord % self.tiles_per_row) as f32;
        let row = (coord / self.tiles_per_row) as f32;
        let tile_u = 1.0 / self.tiles_per_row as f32;
        let tile_v = 1.0 / self.tiles_per_column as f32;
        UvRect {
            u_min: (column + self.inset) * tile_u,
            v_min: (row + self.inset) * tile_v,
            u_max: (column + 1.0 - self.inset) * tile_u,
            v_max: (row + 1.0 - self.inset) * tile_v,
        }
    }
}
