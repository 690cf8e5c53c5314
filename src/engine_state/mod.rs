//! # Engine State Module
//!
//! The core engine module that manages the state and functionality of the voxel engine.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `buffer_state` - The seam to GPU buffers, with an in-memory backend
//! * `camera_state` - The viewer the world streams around
//! * `config` - Engine configuration loaded from JSON
//! * `rendering` - Vertex format, texture atlas, meshing and draw lists
//! * `task_management` - Worker threads for chunk generation
//! * `voxels` - Voxel data, chunks, world generation and streaming
//!
//! ## Frame Loop
//!
//! ```ignore
//! let mut engine = EngineState::new(EngineConfig::default())?;
//! loop {
//!     engine.viewer.camera.translate(movement);
//!     engine.tick();
//!     let draws = engine.render();
//!     // hand `draws` to the renderer
//! }
//! ```
//!
//! `tick` streams the world around the viewer within the load budget;
//! `render` re-meshes within the mesh budget and returns the draw list.

use cgmath::{Deg, Point3};

use buffer_state::{GpuBuffers, HostBuffers};
use camera_state::camera::{Camera, Projection};
use camera_state::{ViewerProvider, ViewerState};
use config::{ConfigError, EngineConfig};
use rendering::{GridAtlas, RenderList};
use voxels::block::block_type::BlockType;
use voxels::streaming::FrameStats;
use voxels::world::{RaycastHit, World};

pub mod buffer_state;
pub mod camera_state;
pub mod config;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// How far the viewer can reach when picking blocks, in blocks.
pub const REACH_DISTANCE: f32 = 8.0;

/// Flags controlling engine behavior and rendering options
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineFlags {
    /// Whether the renderer should draw edges only
    pub wireframe: bool,
}

/// The main state container for the voxel engine
///
/// Owns the configuration, the world, the GPU buffer backend and the viewer,
/// and drives them once per frame.
pub struct EngineState<B: GpuBuffers = HostBuffers> {
    config: EngineConfig,
    /// The voxel world containing all chunk data
    pub world: World,
    /// GPU buffer backend receiving chunk uploads
    pub buffers: B,
    atlas: GridAtlas,
    /// The viewer the world is streamed around
    pub viewer: ViewerState,
    flags: EngineFlags,
    frame: u64,
}

impl EngineState<HostBuffers> {
    /// Creates an engine that keeps its buffers in host memory.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_buffers(config, HostBuffers::new())
    }
}

impl<B: GpuBuffers> EngineState<B> {
    /// Creates an engine state with all subsystems initialized
    ///
    /// The configuration is validated and its initial edits are applied; they
    /// are deferred until their chunks are generated.
    ///
    /// # Arguments
    /// * `config` - Engine configuration
    /// * `buffers` - The GPU buffer backend
    pub fn with_buffers(config: EngineConfig, buffers: B) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world = World::new(&config);
        for (position, block) in config.resolved_edits()? {
            world.set_block_id(position, block);
        }

        let camera = Camera::new(Point3::from(config.viewer_start), Deg(0.0), Deg(-20.0));
        let projection = Projection::new(1280, 720, Deg(70.0), 0.1, 1000.0);

        log::info!(
            "Engine ready: seed {}, chunk {:?}, region {:?}, {} workers",
            config.seed,
            config.chunk_size,
            config.region_magnitude,
            config.worker_threads
        );

        Ok(EngineState {
            flags: EngineFlags {
                wireframe: config.wireframe,
            },
            config,
            world,
            buffers,
            atlas: GridAtlas::default(),
            viewer: ViewerState::new(camera, projection),
            frame: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn flags(&self) -> EngineFlags {
        self.flags
    }

    /// Frames rendered so far; also the animation tick.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Streams the world around the viewer.
    ///
    /// Resets the load budget, integrates finished worker results, re-centers
    /// on the viewer and starts loading queued chunks.
    pub fn tick(&mut self) -> FrameStats {
        self.world.reset_load_budget();
        self.world.collect_generated();
        self.world.set_center(self.viewer.viewer_position());
        self.world.load_pending();
        self.world.stats()
    }

    /// Re-meshes and returns the frame's draws.
    ///
    /// Resets the mesh budget, frees buffers of unloaded chunks, rebuilds
    /// dirty chunks and re-sorts stale transparent batches nearest first.
    pub fn render(&mut self) -> RenderList {
        let viewer = self.viewer.viewer_position();
        self.world.reset_mesh_budget();
        self.world.flush_releases(&mut self.buffers);
        self.world
            .mesh_dirty(&mut self.buffers, &self.atlas, viewer, self.frame);
        self.frame += 1;
        self.world.render_list(viewer, self.flags.wireframe)
    }

    /// Runs [`Self::tick`] then [`Self::render`].
    pub fn frame(&mut self) -> (FrameStats, RenderList) {
        self.tick();
        let draws = self.render();
        (self.world.stats(), draws)
    }

    pub fn toggle_wireframe(&mut self) -> bool {
        self.flags.wireframe = !self.flags.wireframe;
        self.flags.wireframe
    }

    /// The block the viewer is looking at, within reach.
    pub fn target(&self) -> Option<RaycastHit> {
        self.world.raycast(
            self.viewer.viewer_position(),
            self.viewer.forward(),
            REACH_DISTANCE,
        )
    }

    /// Replaces the targeted block with air.
    pub fn break_target(&mut self) -> Option<RaycastHit> {
        let hit = self.target()?;
        self.world.set_block_id(hit.position, BlockType::Air);
        Some(hit)
    }

    /// Places a block against the face of the targeted block.
    ///
    /// # Returns
    /// The position written, or `None` if nothing is in reach or the ray
    /// started inside the target.
    pub fn place_at_target(&mut self, block: BlockType) -> Option<Point3<i32>> {
        let hit = self.target()?;
        if hit.normal == cgmath::Vector3::new(0, 0, 0) {
            return None;
        }
        let position = hit.position + hit.normal;
        self.world.set_block_id(position, block);
        Some(position)
    }
}
