//! # Voxel Sandbox
//!
//! The world core of a block-based sandbox game: chunk storage, procedural
//! terrain, visible-face meshing with depth-sorted transparency, and a
//! streaming window of loaded chunks that follows the viewer.
//!
//! No graphics API is called from this crate. Meshes are handed to a
//! [`GpuBuffers`] implementation and each frame produces a [`RenderList`] the
//! renderer executes.
//!
//! ## Key Modules
//!
//! * `engine_state` - The engine context and every subsystem it owns
//!
//! ## Usage
//!
//! ```no_run
//! use voxel_sandbox::{EngineConfig, EngineState};
//!
//! let mut engine = EngineState::new(EngineConfig::default()).unwrap();
//! for _ in 0..10 {
//!     let (stats, draws) = engine.frame();
//!     println!("{} loaded, {} draws", stats.loaded_chunks, draws.draw_count());
//! }
//! ```

use cgmath::Vector3;
use log::info;

pub mod engine_state;

pub use engine_state::buffer_state::{BufferHandle, GpuBuffers, HostBuffers};
pub use engine_state::config::{ConfigError, EngineConfig};
pub use engine_state::rendering::{DrawCommand, RenderList};
pub use engine_state::voxels::block::block_type::BlockType;
pub use engine_state::voxels::streaming::FrameStats;
pub use engine_state::voxels::world::World;
pub use engine_state::EngineState;

/// Runs the engine headless: loads the configuration named by the first
/// command-line argument (or the defaults), then walks the viewer along +X
/// for the configured number of frames, logging what streaming does.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::from_path(&path) {
            Ok(config) => config,
            Err(error) => {
                log::error!("{error}");
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let mut engine = match EngineState::new(config) {
        Ok(engine) => engine,
        Err(error) => {
            log::error!("{error}");
            std::process::exit(1);
        }
    };

    let walk = Vector3::new(engine.config().walk_speed, 0.0, 0.0);
    for frame in 0..engine.config().ticks {
        engine.viewer.camera.translate(walk);
        let (stats, draws) = engine.frame();
        if frame % 30 == 0 || stats.unloaded > 0 {
            info!(
                "Frame {frame}: {} loaded (+{} -{}), {} pending, {} meshed, {} resorted, {} draws",
                stats.loaded_chunks,
                stats.loaded,
                stats.unloaded,
                stats.pending_loads,
                stats.meshed,
                stats.resorted,
                draws.draw_count()
            );
        }
    }

    info!(
        "Done: {} live buffers, {} bytes allocated",
        engine.buffers.live_buffer_count(),
        engine.buffers.get_total_allocated_memory()
    );
    if let Some(hit) = engine.target() {
        info!(
            "Viewer is looking at {:?} at {:?}, {:.1} blocks away",
            hit.block_type, hit.position, hit.distance
        );
    }
}
