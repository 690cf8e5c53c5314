use std::thread;
use std::time::Duration;

use cgmath::{Point2, Point3, Vector3};
use voxel_sandbox::engine_state::buffer_state::{GpuBuffers, HostBuffers};
use voxel_sandbox::engine_state::config::{EngineConfig, RegionMagnitude};
use voxel_sandbox::engine_state::rendering::texture::GridAtlas;
use voxel_sandbox::engine_state::voxels::block::registry::ANIMATION_FRAME_TICKS;
use voxel_sandbox::engine_state::voxels::chunk::{Chunk, ChunkDimensions};
use voxel_sandbox::engine_state::voxels::streaming::ChunkState;
use voxel_sandbox::engine_state::voxels::world::World;
use voxel_sandbox::{BlockType, EngineState};

const WATER_LEVEL: i32 = 64;

fn config(magnitude: RegionMagnitude) -> EngineConfig {
    EngineConfig {
        water_level: WATER_LEVEL,
        chunk_size: ChunkDimensions::new(4, 128, 4),
        region_magnitude: magnitude,
        load_budget: 100,
        mesh_budget: 100,
        ..EngineConfig::default()
    }
}

/// Meshes until no loaded chunk is dirty.
fn settle_meshes(world: &mut World, buffers: &mut HostBuffers, viewer: Point3<f32>) {
    let atlas = GridAtlas::default();
    for _ in 0..16 {
        world.reset_mesh_budget();
        world.flush_releases(buffers);
        world.mesh_dirty(buffers, &atlas, viewer, 0);
        if world.chunks().all(|chunk| !chunk.is_dirty()) {
            return;
        }
    }
    panic!("meshing did not settle");
}

/// A viewer position inside chunk `offset` of a 4-wide row at z = 0.
fn inside(offset: Point3<i32>) -> Point3<f32> {
    Point3::new(offset.x as f32 * 4.0 + 0.5, 80.0, 0.5)
}

/// The first chunk along x whose trees spill leaves into its +x neighbor,
/// with the positions of those leaves.
fn spilling_source(world: &World) -> (Point3<i32>, Vec<Point3<i32>>) {
    let generator = world.generator();
    let dims = generator.dimensions();
    for x in -300..300 {
        let source = Point3::new(x, 0, 0);
        let target = source + Vector3::new(1, 0, 0);
        let mut chunk = Chunk::new(source, dims);
        let leaves: Vec<Point3<i32>> = generator
            .generate(&mut chunk)
            .into_iter()
            .filter(|write| write.block_type == BlockType::Leaves)
            .map(|write| write.position)
            .filter(|position| dims.split_world_position(*position).0 == target)
            .collect();
        if !leaves.is_empty() {
            return (source, leaves);
        }
    }
    panic!("no chunk spills leaves into its +x neighbor");
}

/// Runs worker loading until nothing is queued or generating.
fn settle_workers(world: &mut World) {
    for _ in 0..2000 {
        world.reset_load_budget();
        world.collect_generated();
        world.load_pending();
        if world.is_settled() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("workers did not settle");
}

#[test]
fn recentering_keeps_the_overlap_and_queues_the_new_strip() {
    let mut world = World::new(&config(RegionMagnitude::new(10, 1, 10)));

    assert!(world.set_center(Point3::new(0.5, 10.0, 0.5)));
    assert_eq!(world.load_pending(), 100);
    assert_eq!(world.loaded_count(), 100);
    assert!(world.heightmap(Point2::new(-1, 0)).is_some());

    world.reset_load_budget();
    assert!(world.set_center(Point3::new(20.5, 10.0, 0.5)));
    assert!(!world.set_center(Point3::new(21.5, 10.0, 0.5)));

    assert_eq!(world.loaded_count(), 50);
    assert!(world.chunks().all(|chunk| (0..5).contains(&chunk.offset.x)));
    assert_eq!(world.pending_loads(), 50);
    assert!(world.pending_offsets().all(|offset| (5..10).contains(&offset.x)));
    assert_eq!(world.pending_offsets().next(), Some(Point3::new(5, 0, 0)));
    assert_eq!(world.stats().unloaded, 50);

    assert!(world.heightmap(Point2::new(-1, 0)).is_none());
    assert!(world.heightmap(Point2::new(0, 0)).is_some());
    assert_eq!(world.chunk_state(Point3::new(-1, 0, 0)), ChunkState::NotLoaded);

    assert_eq!(world.load_pending(), 50);
    assert_eq!(world.loaded_count(), 100);
    assert!(world.is_settled());
}

#[test]
fn load_budget_caps_each_frame_nearest_first() {
    let mut cfg = config(RegionMagnitude::new(4, 1, 4));
    cfg.load_budget = 3;
    let mut world = World::new(&cfg);
    world.set_center(Point3::new(0.5, 10.0, 0.5));

    assert_eq!(world.load_pending(), 3);
    assert_eq!(world.load_pending(), 0);
    assert!(world.chunk(Point3::new(0, 0, 0)).is_some());
    assert_eq!(world.pending_loads(), 13);

    world.reset_load_budget();
    assert_eq!(world.load_pending(), 3);
    assert_eq!(world.loaded_count(), 6);
}

#[test]
fn unloading_frees_buffers_on_the_next_flush() {
    let mut world = World::new(&config(RegionMagnitude::new(2, 1, 2)));
    let mut buffers = HostBuffers::new();
    let viewer = Point3::new(0.5, 80.0, 0.5);
    world.set_center(viewer);
    world.load_pending();
    settle_meshes(&mut world, &mut buffers, viewer);
    let live = buffers.live_buffer_count();
    assert!(live > 0);

    world.set_center(Point3::new(400.5, 80.0, 0.5));
    assert_eq!(world.loaded_count(), 0);
    assert_eq!(buffers.live_buffer_count(), live);
    assert_eq!(world.flush_releases(&mut buffers), live);
    assert_eq!(buffers.live_buffer_count(), 0);
}

#[test]
fn boundary_edit_dirties_only_the_touching_neighbor() {
    let mut world = World::new(&config(RegionMagnitude::new(4, 1, 4)));
    let mut buffers = HostBuffers::new();
    let viewer = Point3::new(0.5, 80.0, 0.5);
    world.set_center(viewer);
    world.load_pending();
    settle_meshes(&mut world, &mut buffers, viewer);

    world.set_block_id(Point3::new(0, 125, 1), BlockType::Stone);
    assert_eq!(world.chunk_state(Point3::new(0, 0, 0)), ChunkState::Dirty);
    assert_eq!(world.chunk_state(Point3::new(-1, 0, 0)), ChunkState::Dirty);
    assert_eq!(world.chunk_state(Point3::new(1, 0, 0)), ChunkState::Clean);
    assert_eq!(world.chunk_state(Point3::new(0, 0, -1)), ChunkState::Clean);
    assert_eq!(world.chunk_state(Point3::new(0, 0, 1)), ChunkState::Clean);
    assert_eq!(world.surface_height(0, 1), Some(125));
    assert_eq!(world.light(Point3::new(0, 124, 1)).sunlight(), 0);
    assert_eq!(world.light(Point3::new(0, 126, 1)).sunlight(), 15);
}

#[test]
fn remeshing_an_unchanged_chunk_uploads_identical_data() {
    let mut world = World::new(&config(RegionMagnitude::new(3, 1, 3)));
    let mut buffers = HostBuffers::new();
    let viewer = Point3::new(2.5, 80.0, 2.5);
    world.set_center(viewer);
    world.load_pending();
    settle_meshes(&mut world, &mut buffers, viewer);

    let offset = Point3::new(0, 0, 0);
    let snapshot = |world: &World, buffers: &HostBuffers| {
        let mesh = &world.chunk(offset).expect("loaded").mesh;
        [mesh.solid.handle, mesh.transparent.handle].map(|handle| {
            handle.map(|handle| (buffers.vertices(handle), buffers.indices(handle).to_vec()))
        })
    };
    let before = snapshot(&world, &buffers);
    assert!(before[0].is_some());

    // Writing the same block back only marks the chunk dirty.
    let position = Point3::new(1, 30, 1);
    let block = world.block_id(position);
    world.set_block_id(position, block);
    assert_eq!(world.chunk_state(offset), ChunkState::Dirty);
    settle_meshes(&mut world, &mut buffers, viewer);

    assert_eq!(snapshot(&world, &buffers), before);
}

#[test]
fn mesh_budget_rebuilds_nearest_chunks_first() {
    let mut cfg = config(RegionMagnitude::new(4, 1, 4));
    cfg.mesh_budget = 3;
    let mut world = World::new(&cfg);
    let mut buffers = HostBuffers::new();
    let atlas = GridAtlas::default();
    let viewer = Point3::new(0.5, 64.0, 0.5);
    world.set_center(viewer);
    world.load_pending();

    world.reset_mesh_budget();
    assert_eq!(world.mesh_dirty(&mut buffers, &atlas, viewer, 0), 3);
    assert_eq!(world.stats().meshed, 3);
    for offset in [Point3::new(0, 0, 0), Point3::new(-1, 0, 0), Point3::new(0, 0, -1)] {
        assert_eq!(world.chunk_state(offset), ChunkState::Clean, "{offset:?}");
    }
    assert_eq!(world.chunk_state(Point3::new(-1, 0, -1)), ChunkState::Dirty);
    assert_eq!(
        world.chunks().filter(|chunk| chunk.is_dirty()).count(),
        13
    );

    assert_eq!(world.mesh_dirty(&mut buffers, &atlas, viewer, 0), 0);
}

#[test]
fn render_list_draws_transparent_chunks_far_to_near() {
    let mut engine = EngineState::new(config(RegionMagnitude::new(3, 1, 3))).expect("config");
    for _ in 0..8 {
        engine.frame();
    }
    let viewer = engine.viewer.camera.position;
    let draws = engine.render();
    assert!(!draws.solid.is_empty());

    let distances: Vec<f32> = draws
        .transparent
        .iter()
        .map(|draw| {
            let origin = draw.model.w;
            let dx = origin.x + 2.0 - viewer.x;
            let dz = origin.z + 2.0 - viewer.z;
            let dy = origin.y + 64.0 - viewer.y;
            dx * dx + dy * dy + dz * dz
        })
        .collect();
    assert!(distances.windows(2).all(|pair| pair[0] >= pair[1]));
    for draw in draws.solid.iter().chain(&draws.transparent) {
        assert!(engine.buffers.contains(draw.buffers));
    }
}

#[test]
fn worker_generation_matches_inline_generation() {
    let magnitude = RegionMagnitude::new(3, 1, 3);
    let mut inline = World::new(&config(magnitude));
    let mut threaded_config = config(magnitude);
    threaded_config.worker_threads = 2;
    let mut threaded = World::new(&threaded_config);

    let center = Point3::new(0.5, 80.0, 0.5);
    inline.set_center(center);
    inline.load_pending();
    threaded.set_center(center);
    assert_eq!(threaded.generating_count(), 0);
    threaded.load_pending();
    assert_eq!(threaded.chunk_state(Point3::new(0, 0, 0)), ChunkState::Generating);
    settle_workers(&mut threaded);

    assert_eq!(threaded.loaded_count(), 9);
    for chunk in inline.chunks() {
        let other = threaded.chunk(chunk.offset).expect("loaded by workers");
        for z in 0..4 {
            for x in 0..4 {
                for y in 0..(WATER_LEVEL - 1) as usize {
                    assert_eq!(
                        chunk.block_type(x, y, z),
                        other.block_type(x, y, z),
                        "chunk {:?} cell ({x}, {y}, {z})",
                        chunk.offset
                    );
                }
            }
        }
    }
}

#[test]
fn results_for_chunks_left_behind_are_dropped() {
    let mut cfg = config(RegionMagnitude::new(3, 1, 3));
    cfg.worker_threads = 2;
    let mut world = World::new(&cfg);

    world.set_center(Point3::new(0.5, 80.0, 0.5));
    assert_eq!(world.load_pending(), 9);
    world.set_center(Point3::new(1000.5, 80.0, 0.5));

    for _ in 0..2000 {
        world.collect_generated();
        if world.generating_count() == 0 {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(world.generating_count(), 0);
    assert_eq!(world.stats().dropped, 9);
    assert_eq!(world.loaded_count(), 0);
}

#[test]
fn edits_before_loading_are_replayed() {
    let mut world = World::new(&config(RegionMagnitude::new(2, 1, 2)));
    let position = Point3::new(-3, 110, 2);
    world.set_block_id(position, BlockType::Planks);
    assert_eq!(world.block_id(position), BlockType::Planks);
    assert_eq!(world.deferred_edit_count(), 1);

    world.set_center(Point3::new(0.5, 80.0, 0.5));
    world.load_pending();
    assert_eq!(world.cell(position).map(|cell| cell.block_type), Some(BlockType::Planks));
    assert_eq!(world.deferred_edits(Point3::new(-1, 0, 0)).len(), 0);
}

#[test]
fn buffers_trait_object_is_usable() {
    let mut buffers = HostBuffers::new();
    let backend: &mut dyn GpuBuffers = &mut buffers;
    let handle = backend.upload_mesh("empty", &[], &[]);
    backend.release(handle);
    assert_eq!(buffers.live_buffer_count(), 0);
    assert_eq!(buffers.released_count(), 1);
}

#[test]
fn far_edits_survive_until_their_chunk_loads() {
    let mut world = World::new(&config(RegionMagnitude::new(2, 1, 2)));
    let position = Point3::new(400, 120, 0);
    world.set_block_id(position, BlockType::Planks);

    world.set_center(Point3::new(0.5, 80.0, 0.5));
    world.load_pending();
    assert_eq!(world.deferred_edit_count(), 1);
    assert_eq!(world.block_id(position), BlockType::Planks);

    world.set_center(Point3::new(400.5, 80.0, 0.5));
    world.reset_load_budget();
    world.load_pending();
    assert_eq!(world.cell(position).map(|cell| cell.block_type), Some(BlockType::Planks));
    assert_eq!(world.deferred_edit_count(), 0);
}

#[test]
fn spilled_leaves_return_when_their_chunk_is_generated_again() {
    let mut world = World::new(&config(RegionMagnitude::new(2, 1, 1)));
    let (source, leaves) = spilling_source(&world);
    let target = source + Vector3::new(1, 0, 0);

    world.set_center(inside(target));
    world.load_pending();
    assert!(world.chunk(source).is_some());
    let before: Vec<BlockType> = leaves.iter().map(|p| world.block_id(*p)).collect();
    assert!(before.contains(&BlockType::Leaves));

    world.set_center(inside(source));
    world.reset_load_budget();
    world.load_pending();
    assert!(world.chunk(target).is_none());

    world.set_center(inside(target));
    world.reset_load_budget();
    world.load_pending();
    assert!(world.chunk(target).is_some());
    let after: Vec<BlockType> = leaves.iter().map(|p| world.block_id(*p)).collect();
    assert_eq!(after, before);
}

#[test]
fn spill_into_a_meshed_neighbor_lands_and_dirties_it() {
    let mut cfg = config(RegionMagnitude::new(2, 1, 1));
    cfg.load_budget = 1;
    let mut world = World::new(&cfg);
    let mut buffers = HostBuffers::new();
    let (source, leaves) = spilling_source(&world);
    let target = source + Vector3::new(1, 0, 0);
    let viewer = inside(target);

    world.set_center(viewer);
    assert_eq!(world.load_pending(), 1);
    assert!(world.chunk(target).is_some());
    assert!(world.chunk(source).is_none());
    settle_meshes(&mut world, &mut buffers, viewer);
    assert_eq!(world.chunk_state(target), ChunkState::Clean);
    let before: Vec<BlockType> = leaves.iter().map(|p| world.block_id(*p)).collect();

    world.reset_load_budget();
    assert_eq!(world.load_pending(), 1);
    assert_eq!(world.chunk_state(target), ChunkState::Dirty);
    let after: Vec<BlockType> = leaves.iter().map(|p| world.block_id(*p)).collect();
    assert!(before
        .iter()
        .zip(&after)
        .any(|(was, now)| *was == BlockType::Air && *now == BlockType::Leaves));
    assert!(before
        .iter()
        .zip(&after)
        .all(|(was, now)| *was == BlockType::Air || was == now));
}

#[test]
fn animated_chunks_follow_the_animation_phase() {
    let mut world = World::new(&config(RegionMagnitude::new(2, 1, 2)));
    let mut buffers = HostBuffers::new();
    let atlas = GridAtlas::default();
    let viewer = Point3::new(0.5, 80.0, 0.5);
    world.set_center(viewer);
    world.load_pending();
    world.set_block_id(Point3::new(1, 125, 1), BlockType::Water);
    settle_meshes(&mut world, &mut buffers, viewer);

    let offset = Point3::new(0, 0, 0);
    let water_vertices = |world: &World, buffers: &HostBuffers| {
        let handle = world.chunk(offset).and_then(|chunk| chunk.mesh.transparent.handle);
        handle.map(|handle| buffers.vertices(handle))
    };
    assert_eq!(world.chunk(offset).and_then(|c| c.mesh.animation_phase()), Some(0));
    let first = water_vertices(&world, &buffers);
    assert!(first.is_some());

    world.reset_mesh_budget();
    assert_eq!(world.mesh_dirty(&mut buffers, &atlas, viewer, ANIMATION_FRAME_TICKS - 1), 0);

    world.reset_mesh_budget();
    assert!(world.mesh_dirty(&mut buffers, &atlas, viewer, ANIMATION_FRAME_TICKS) > 0);
    assert_eq!(world.chunk(offset).and_then(|c| c.mesh.animation_phase()), Some(1));
    assert!(world
        .chunks()
        .all(|chunk| !chunk.mesh.is_animation_stale(1)));
    assert_ne!(water_vertices(&world, &buffers), first);
    assert_eq!(world.chunk_state(offset), ChunkState::Clean);
}
