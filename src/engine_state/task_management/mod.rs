//! # Task Management System
//!
//! This module provides a small thread pool for executing work off the owning
//! thread. It's used for chunk generation when worker threads are enabled.
//!
//! ## Architecture Overview
//!
//! The task management system consists of several key components:
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed on a worker
//! - `TaskResult`: The result of a completed task, applied on the owning thread
//! - `TaskChannel`: Communication channel between the owning thread and one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send back results
//! 4. Results are drained on the owning thread with `drain_completed()`
//! 5. The caller applies each result with `TaskResult::handle_result()`
//!
//! ## Performance Considerations
//! - **Task Granularity**: one chunk per task keeps scheduling overhead low
//! - **Memory**: each task owns its data, so nothing is locked while it runs
//! - **Back-pressure**: at most `MAX_TASKS_IN_FLIGHT` tasks per worker; the
//!   rest wait in a FIFO queue
//!
//! ## Worker Failure
//! A worker whose task panics takes its channel down with it. The manager
//! notices the closed channel, logs it, stops scheduling on it and counts the
//! tasks it still held as lost. Callers poll `take_lost_tasks()` and decide
//! what to run again.
//!
//! ## Example Usage
//! ```ignore
//! let mut task_manager = TaskManager::new(num_workers);
//!
//! task_manager.publish_task(Box::new(MyTask::new(...)));
//!
//! // In the frame loop:
//! task_manager.process_queued_tasks();
//! for result in task_manager.drain_completed() {
//!     result.handle_result(&mut world);
//! }
//! ```

pub mod task;

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use task::{Task, TaskResult};

/// A communication channel between the owning thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from the owning thread to the worker
/// - `result_receiver`: Receives task results from the worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `alive`: Cleared once the worker is found disconnected
/// - `_worker`: Handle to the worker thread
///
/// # Implementation Notes
/// - Each channel is backed by an OS thread
/// - Dropping the channel closes the task sender, which ends the worker loop
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    alive: bool,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: Set of active worker channels
/// - `queued_tasks`: Tasks waiting for an available worker
/// - `current_channel`: Index for round-robin scheduling
/// - `lost_tasks`: Tasks held by workers that died, not yet reported
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
    lost_tasks: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Two keeps a worker busy while its previous result waits to be drained.
pub const MAX_TASKS_IN_FLIGHT: usize = 2;

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create
    ///
    /// # Panics
    /// Panics if the underlying thread creation fails.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        log::info!(
            "Starting {num_workers} task workers (available parallelism: {:?})",
            thread::available_parallelism()
        );

        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            };

            let worker = match thread::Builder::new()
                .name(format!("task-worker-{index}"))
                .spawn(task_closure)
            {
                Ok(worker) => worker,
                Err(error) => panic!("failed to spawn task worker {index}: {error}"),
            };

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                alive: true,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
            lost_tasks: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was successfully sent to the worker
    /// - `Err(task)` if the send failed (e.g., worker disconnected); the
    ///   channel is retired
    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => {
                self.retire_channel(channel_idx);
                Err(task.0)
            }
        }
    }

    /// Stops scheduling on a disconnected worker and counts its in-flight
    /// tasks as lost.
    fn retire_channel(&mut self, channel_idx: usize) {
        let channel = &mut self.channels[channel_idx];
        if !channel.alive {
            return;
        }
        log::error!(
            "Task worker {channel_idx} disconnected with {} tasks in flight",
            channel.num_tasks_in_flight
        );
        channel.alive = false;
        self.lost_tasks += channel.num_tasks_in_flight;
        channel.num_tasks_in_flight = 0;
    }

    /// Finds an available worker channel that can accept a new task, scanning
    /// round-robin from the last used channel.
    ///
    /// # Returns
    /// - `Some(usize)` index of an available channel
    /// - `None` if all channels are busy or there are no channels available
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|step| (self.current_channel + step) % count)
            .find(|&index| {
                let channel = &self.channels[index];
                channel.alive && channel.num_tasks_in_flight < MAX_TASKS_IN_FLIGHT
            })
    }

    /// Publishes a new task for execution.
    ///
    /// The task will be executed as soon as a worker becomes available, or
    /// queued if all workers are busy.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued because all workers are busy
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        if !self.queued_tasks.is_empty() {
            self.queued_tasks.push_back(task);
            self.process_queued_tasks();
            return false;
        }

        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    self.process_queued_tasks();
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Schedules queued tasks, oldest first, until the queue is empty or all
    /// workers are busy.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => self.queued_tasks.push_front(task),
            }
        }
    }

    /// Collects all results that workers have finished so far.
    ///
    /// Results are returned in the order they were received per worker. The
    /// caller applies them to the world.
    ///
    /// A worker found disconnected is retired; see [`Self::take_lost_tasks`].
    pub fn drain_completed(&mut self) -> Vec<Box<dyn TaskResult + Send>> {
        let mut results = Vec::new();
        for channel_idx in 0..self.channels.len() {
            while self.channels[channel_idx].alive {
                let channel = &mut self.channels[channel_idx];
                match channel.result_receiver.try_recv() {
                    Ok(result) => {
                        channel.num_tasks_in_flight -= 1;
                        results.push(result);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => self.retire_channel(channel_idx),
                }
            }
        }
        self.process_queued_tasks();
        results
    }

    /// Tasks lost with disconnected workers since the last call.
    pub fn take_lost_tasks(&mut self) -> usize {
        std::mem::take(&mut self.lost_tasks)
    }

    /// Workers still accepting tasks.
    pub fn live_workers(&self) -> usize {
        self.channels.iter().filter(|channel| channel.alive).count()
    }

    /// Tasks sent to workers whose results have not been drained.
    pub fn in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Tasks waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.queued_tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0 && self.queued_tasks.is_empty()
    }

    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::engine_state::voxels::world::World;

    struct Echo;
    struct Done;
    struct Crash;

    impl Task for Echo {
        fn process(self: Box<Self>) -> Box<dyn TaskResult + Send> {
            Box::new(Done)
        }
    }

    impl Task for Crash {
        fn process(self: Box<Self>) -> Box<dyn TaskResult + Send> {
            panic!("task failed on its worker");
        }
    }

    impl TaskResult for Done {
        fn handle_result(self: Box<Self>, _world: &mut World) {}
    }

    /// Drains until `done` holds, returning the results and lost tasks seen.
    fn drain_until(
        manager: &mut TaskManager,
        done: impl Fn(&TaskManager, usize) -> bool,
    ) -> (usize, usize) {
        let mut results = 0;
        let mut lost = 0;
        for _ in 0..2000 {
            results += manager.drain_completed().len();
            lost += manager.take_lost_tasks();
            if done(manager, results) {
                return (results, lost);
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("workers did not finish");
    }

    #[test]
    fn test_tasks_round_trip() {
        let mut manager = TaskManager::new(2);
        for _ in 0..5 {
            manager.publish_task(Box::new(Echo));
        }
        assert!(manager.in_flight() <= 2 * MAX_TASKS_IN_FLIGHT);
        let (results, lost) = drain_until(&mut manager, |_, results| results == 5);
        assert_eq!((results, lost), (5, 0));
        assert!(manager.is_idle());
        assert_eq!(manager.live_workers(), 2);
    }

    #[test]
    fn test_panicking_worker_is_retired() {
        let mut manager = TaskManager::new(1);
        assert!(manager.publish_task(Box::new(Crash)));
        let (results, lost) = drain_until(&mut manager, |manager, _| manager.live_workers() == 0);
        assert_eq!((results, lost), (0, 1));
        assert_eq!(manager.in_flight(), 0);

        assert!(!manager.publish_task(Box::new(Echo)));
        assert_eq!(manager.queued(), 1);
        assert_eq!(manager.take_lost_tasks(), 0);
    }

    #[test]
    fn test_surviving_worker_takes_over() {
        let mut manager = TaskManager::new(2);
        manager.publish_task(Box::new(Crash));
        for _ in 0..3 {
            manager.publish_task(Box::new(Echo));
        }
        let (results, lost) = drain_until(&mut manager, |manager, _| {
            manager.live_workers() == 1 && manager.is_idle()
        });
        assert_eq!(results + lost, 4);
        assert!(lost >= 1);
    }
}
