//! # Voxel Task System
//!
//! This module contains tasks related to voxel world generation. They run on
//! the task workers so generation does not stall the frame loop.

pub mod chunk_generation_task;
