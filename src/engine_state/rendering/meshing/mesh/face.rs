use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::engine_state::voxels::block::block_side::BlockSide;

/// The four corners of a quad in the order lower-left, lower-right,
/// upper-left, upper-right, as seen from the side the quad faces.
pub type QuadCorners = [Point3<f32>; 4];

/// Face-space UV of each corner of [`QuadCorners`], `v` growing downward.
pub const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]];

/// Top surface height of a liquid whose upper neighbor is not liquid.
pub const LIQUID_SURFACE_HEIGHT: f32 = 0.9;

/// Bounds of the torch post inside its cell.
pub const TORCH_MIN: [f32; 3] = [7.0 / 16.0, 0.0, 7.0 / 16.0];
pub const TORCH_MAX: [f32; 3] = [9.0 / 16.0, 10.0 / 16.0, 9.0 / 16.0];

/// Unit cube corners per side, indexed by `BlockSide as usize`.
const CUBE_FACE_CORNERS: [[[f32; 3]; 4]; 6] = [
    // FRONT (+Z)
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
    // BACK (-Z)
    [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
    // BOTTOM (-Y)
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0]],
    // TOP (+Y)
    [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
    // LEFT (-X)
    [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.0, 1.0, 1.0]],
    // RIGHT (+X)
    [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]],
];

/// The two diagonal quads of a sprite.
pub const SPRITE_QUADS: [[[f32; 3]; 4]; 2] = [
    [[0.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0]],
    [[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 1.0]],
];

/// Corners of one side of the axis-aligned box `[min, max]`.
pub fn box_face(side: BlockSide, min: Point3<f32>, max: Point3<f32>) -> QuadCorners {
    let size = max - min;
    CUBE_FACE_CORNERS[side as usize].map(|[x, y, z]| {
        Point3::new(min.x + x * size.x, min.y + y * size.y, min.z + z * size.z)
    })
}

/// Corners of one side of the unit cube at `base`.
pub fn cube_face(side: BlockSide, base: Point3<f32>) -> QuadCorners {
    box_face(side, base, base + Vector3::new(1.0, 1.0, 1.0))
}

/// Translates raw corner coordinates to `base`.
pub fn quad_at(corners: [[f32; 3]; 4], base: Point3<f32>) -> QuadCorners {
    corners.map(|corner| base + Vector3::from(corner))
}

/// A single quad of a mesh batch: its six triangle indices and the
/// world-space center used for depth sorting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshFace {
    pub indices: [u32; 6],
    pub center: Point3<f32>,
}

impl MeshFace {
    /// Creates the face whose four vertices start at `first_vertex`.
    pub fn new(first_vertex: u32, center: Point3<f32>) -> Self {
        MeshFace {
            indices: Self::generate_face_indices(first_vertex),
            center,
        }
    }

    /// Generates the two counter-clockwise triangles of a quad whose corners
    /// were pushed in [`QuadCorners`] order.
    ///
    /// # Arguments
    /// * `first_vertex` - Index of the quad's lower-left vertex
    pub fn generate_face_indices(first_vertex: u32) -> [u32; 6] {
        let v = first_vertex;
        [v, v + 1, v + 3, v, v + 3, v + 2]
    }

    /// Average of the quad corners.
    pub fn quad_center(corners: &QuadCorners) -> Point3<f32> {
        Point3::centroid(corners)
    }
}
