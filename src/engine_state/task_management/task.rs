//! # Task System Core Traits
//!
//! This module defines the fundamental building blocks of the task system,
//! which provides a framework for executing work on background threads.
//!
//! ## Core Components
//! - `Task`: Represents a unit of work that can be executed on a worker
//! - `TaskResult`: Represents the result of a completed task
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the owning thread with the world
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - `TaskResult` must be `Send` to be transferred back to the owning thread
//! - Tasks own their data; nothing is shared with the world while in flight

use crate::engine_state::voxels::world::World;

/// A unit of work that can be executed on a worker thread.
///
/// Tasks should be self-contained and own all the data they need.
pub trait Task: Send {
    /// Processes the task and returns a result.
    ///
    /// Runs on a worker thread and consumes the task, so owned data can move
    /// into the result without copying.
    ///
    /// # Returns
    /// A boxed `TaskResult` that will be processed on the owning thread.
    fn process(self: Box<Self>) -> Box<dyn TaskResult + Send>;
}

/// The result of processing a `Task`.
pub trait TaskResult: Send {
    /// Applies the result to the world on the owning thread.
    ///
    /// # Implementation Notes
    /// - Runs on the owning thread - keep it fast to avoid frame drops
    fn handle_result(self: Box<Self>, world: &mut World);
}
