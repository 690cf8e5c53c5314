//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask` which generates a chunk on a
//! worker thread. It is scheduled by the world when worker threads are enabled
//! and a pending offset is loaded.

use std::sync::Arc;

use cgmath::Point3;

use crate::engine_state::{
    task_management::task::{Task, TaskResult},
    voxels::{
        chunk::Chunk,
        generation::{PendingWrite, WorldGenerator},
        world::World,
    },
};

/// A task that generates chunk data on a worker.
///
/// The task owns the chunk it fills. Nothing in the world is touched until
/// the result is handled on the owning thread.
pub struct ChunkGenerationTask {
    /// The generator shared by all workers
    generator: Arc<WorldGenerator>,
    /// The chunk being filled, already flagged as generating
    chunk: Chunk,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `generator` - The world's terrain generator
    /// * `offset` - The chunk coordinates of the chunk to generate
    pub fn new(generator: Arc<WorldGenerator>, offset: Point3<i32>) -> Self {
        let mut chunk = Chunk::new(offset, generator.dimensions());
        chunk.set_generating(true);
        ChunkGenerationTask { generator, chunk }
    }
}

impl Task for ChunkGenerationTask {
    fn process(self: Box<Self>) -> Box<dyn TaskResult + Send> {
        let ChunkGenerationTask {
            generator,
            mut chunk,
        } = *self;
        let overflow = generator.generate(&mut chunk);
        Box::new(ChunkGenerationTaskResult { chunk, overflow })
    }
}

/// The result of a chunk generation task.
///
/// Holds the generated chunk and the decoration writes that landed in its
/// neighbors.
pub struct ChunkGenerationTaskResult {
    chunk: Chunk,
    overflow: Vec<PendingWrite>,
}

impl TaskResult for ChunkGenerationTaskResult {
    /// Hands the chunk to the world, which drops it if its offset left the
    /// active region while the task was in flight.
    fn handle_result(self: Box<Self>, world: &mut World) {
        world.finish_generation(self.chunk, self.overflow);
    }
}
