//! Property-based tests for chunk addressing, region bookkeeping and
//! transparency ordering
//!
//! Critical invariants:
//! - Every world position splits into exactly one chunk and local cell
//! - A region contains exactly the offsets it enumerates
//! - Sorted transparent faces never get closer to the viewer

use cgmath::{MetricSpace, Point3, Vector3};
use proptest::prelude::*;
use voxel_sandbox::engine_state::rendering::meshing::{ChunkMeshBuilder, NoNeighbors};
use voxel_sandbox::engine_state::rendering::texture::GridAtlas;
use voxel_sandbox::engine_state::voxels::block::block_type::BlockType;
use voxel_sandbox::engine_state::voxels::chunk::{Chunk, ChunkDimensions};
use voxel_sandbox::engine_state::voxels::streaming::ActiveRegion;

const DIMS: ChunkDimensions = ChunkDimensions::new(8, 8, 8);

proptest! {
    /// Property: splitting a world position and rebuilding it is lossless
    #[test]
    fn world_positions_split_into_one_chunk(
        x in -1000i32..1000,
        y in -1000i32..1000,
        z in -1000i32..1000,
        sx in 1usize..20,
        sy in 1usize..40,
        sz in 1usize..20,
    ) {
        let dims = ChunkDimensions::new(sx, sy, sz);
        let world = Point3::new(x, y, z);
        let (offset, local) = dims.split_world_position(world);

        prop_assert!(local.x < sx && local.y < sy && local.z < sz);
        let rebuilt = dims.origin_of(offset)
            + Vector3::new(local.x as i32, local.y as i32, local.z as i32);
        prop_assert_eq!(rebuilt, world);

        let chunk = Chunk::new(offset, dims);
        prop_assert_eq!(chunk.world_to_local(world), Some(local));
    }

    /// Property: `in_bounds` and `on_bounds` agree with the per-axis ranges
    #[test]
    fn bounds_predicates_match_axis_ranges(
        x in -3i32..11,
        y in -3i32..11,
        z in -3i32..11,
    ) {
        let chunk = Chunk::new(Point3::new(0, 0, 0), DIMS);
        let local = Point3::new(x, y, z);
        let inside = |v: i32| (0..8).contains(&v);
        prop_assert_eq!(chunk.in_bounds(local), inside(x) && inside(y) && inside(z));

        if chunk.in_bounds(local) {
            let edge = |v: i32| v == 0 || v == 7;
            prop_assert_eq!(chunk.on_bounds(local), edge(x) || edge(y) || edge(z));
            let touched = chunk
                .boundary_sides(Point3::new(x as usize, y as usize, z as usize))
                .len();
            prop_assert_eq!(touched > 0, chunk.on_bounds(local));
        }
    }

    /// Property: a region contains an offset iff it enumerates it
    #[test]
    fn region_contains_what_it_enumerates(
        cx in -50i32..50,
        cz in -50i32..50,
        mx in 1i32..8,
        my in 1i32..3,
        mz in 1i32..8,
        px in -60i32..60,
        py in -3i32..3,
        pz in -60i32..60,
    ) {
        let region = ActiveRegion::centered_on(Point3::new(cx, 0, cz), Vector3::new(mx, my, mz));
        let offsets: Vec<Point3<i32>> = region.offsets().collect();

        prop_assert_eq!(offsets.len() as i32, mx * my * mz);
        prop_assert!(region.contains(Point3::new(cx, 0, cz)));
        let candidate = Point3::new(px, py, pz);
        prop_assert_eq!(region.contains(candidate), offsets.contains(&candidate));
        prop_assert!(region.expanded(1).contains(region.origin() - Vector3::new(1, 1, 1)));
    }

    /// Property: after sorting, transparent faces are farthest first
    #[test]
    fn transparent_faces_sort_back_to_front(
        blocks in prop::collection::vec((0usize..8, 0usize..8, 0usize..8), 1..12),
        vx in -20.0f32..28.0,
        vy in -20.0f32..28.0,
        vz in -20.0f32..28.0,
    ) {
        let mut chunk = Chunk::new(Point3::new(1, 0, -1), DIMS);
        for (x, y, z) in blocks {
            chunk.set_block_type(x, y, z, BlockType::Glass);
        }
        let atlas = GridAtlas::default();
        let mut mesh = ChunkMeshBuilder::new(&NoNeighbors, &atlas).build(&chunk);
        let viewer = Point3::new(vx, vy, vz);
        mesh.sort_transparent(viewer);

        let distances: Vec<f32> = mesh
            .transparent
            .faces
            .iter()
            .map(|face| face.center.distance2(viewer))
            .collect();
        prop_assert!(!distances.is_empty());
        prop_assert!(distances.windows(2).all(|pair| pair[0] >= pair[1]));
    }
}
