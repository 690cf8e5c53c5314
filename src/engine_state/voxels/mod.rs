//! # Voxel Engine Core
//!
//! This module contains the core voxel engine functionality, providing the foundation
//! for representing, generating and streaming a voxel-based world.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: Block identifiers, the kind registry, faces and packed light
//! * **Chunk**: Fixed-size 3D grids of cells with dirty/generating bookkeeping
//! * **Noise**: Improved Perlin noise, octave sums and domain warping
//! * **Generation**: Terrain, biomes and decorations for fresh chunks
//! * **Heightmap**: Highest opaque block per column, driving sunlight
//! * **World**: Block access by world position, deferred edits, raycasts
//! * **Streaming**: The active region, per-frame budgets and the mesh pass
//! * **Tasks**: Chunk generation on worker threads
//!
//! ## Data Flow
//!
//! 1. Streaming decides which chunk offsets should exist
//! 2. The generator fills each new chunk, inline or on a worker
//! 3. The world integrates the chunk and marks its neighbors dirty
//! 4. Dirty chunks are re-meshed within the mesh budget and handed to the renderer
//!
//! ## Thread Safety
//!
//! Chunks and heightmaps are only mutated on the owning thread. A chunk being
//! generated on a worker is owned by that worker's task until its result is
//! handled.

pub mod block;
pub mod chunk;
pub mod generation;
pub mod heightmap;
pub mod noise;
pub mod streaming;
pub mod tasks;
pub mod world;
