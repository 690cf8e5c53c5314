//! # Buffer State Module
//!
//! This module defines the seam between chunk meshes and whatever owns GPU
//! memory. Meshes are uploaded as one vertex buffer plus one index buffer and
//! are afterwards referenced by an opaque [`BufferHandle`].
//!
//! ## Key Features
//!
//! * [`GpuBuffers`]: upload, index rewrite and release of mesh buffers
//! * [`HostBuffers`]: an in-memory backend that keeps the uploaded bytes,
//!   used for headless runs and tests
//! * Buffer usage analytics and memory tracking
//!
//! ## Architecture
//!
//! The world never talks to a graphics API. Mesh batches hand their vertex and
//! index data to a `GpuBuffers` implementation and keep only the returned
//! handle; transparent batches later rewrite their index buffer in place when
//! the viewer moves.

use std::collections::HashMap;

use crate::engine_state::rendering::Vertex;

/// Opaque reference to an uploaded mesh buffer pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl BufferHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Owner of the GPU-side mesh buffers.
pub trait GpuBuffers {
    /// Creates a vertex and an index buffer initialized with the given data.
    fn upload_mesh(&mut self, label: &str, vertices: &[Vertex], indices: &[u32]) -> BufferHandle;

    /// Overwrites the index buffer of a live upload. The index count must not
    /// change.
    ///
    /// # Panics
    /// Implementations panic on unknown handles or mismatched sizes.
    fn write_indices(&mut self, handle: BufferHandle, indices: &[u32]);

    /// Frees both buffers of an upload.
    fn release(&mut self, handle: BufferHandle);
}

/// Analytics data for an uploaded mesh.
///
/// Tracks memory allocation and write operations for a buffer pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferAnalytics {
    /// Total memory allocated for the buffers in bytes
    pub allocated_memory: u64,
    /// Number of times the buffers have been written to
    pub times_written: u64,
}

#[derive(Debug)]
struct HostBuffer {
    label: String,
    vertex_bytes: Vec<u8>,
    indices: Vec<u32>,
    analytics: BufferAnalytics,
}

/// In-memory [`GpuBuffers`] backend.
///
/// Keeps a copy of every live upload so callers can inspect exactly what a
/// renderer would have received.
#[derive(Debug, Default)]
pub struct HostBuffers {
    next_handle: u64,
    buffers: HashMap<BufferHandle, HostBuffer>,
    released: u64,
}

impl HostBuffers {
    pub fn new() -> Self {
        HostBuffers::default()
    }

    fn buffer(&self, handle: BufferHandle) -> &HostBuffer {
        match self.buffers.get(&handle) {
            Some(buffer) => buffer,
            None => panic!("buffer {handle:?} does not exist"),
        }
    }

    /// Number of uploads that have not been released.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of uploads released so far.
    pub fn released_count(&self) -> u64 {
        self.released
    }

    pub fn contains(&self, handle: BufferHandle) -> bool {
        self.buffers.contains_key(&handle)
    }

    pub fn label(&self, handle: BufferHandle) -> &str {
        &self.buffer(handle).label
    }

    /// The vertices of a live upload, decoded from its bytes.
    ///
    /// # Panics
    /// Panics if the buffer does not exist
    pub fn vertices(&self, handle: BufferHandle) -> Vec<Vertex> {
        self.buffer(handle)
            .vertex_bytes
            .chunks_exact(std::mem::size_of::<Vertex>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }

    /// The current index buffer of a live upload.
    ///
    /// # Panics
    /// Panics if the buffer does not exist
    pub fn indices(&self, handle: BufferHandle) -> &[u32] {
        &self.buffer(handle).indices
    }

    pub fn analytics(&self, handle: BufferHandle) -> &BufferAnalytics {
        &self.buffer(handle).analytics
    }

    /// Gets the total allocated memory across all live buffers
    ///
    /// # Returns
    ///
    /// Total allocated memory in bytes
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.buffers
            .values()
            .fold(0, |acc, buffer| acc + buffer.analytics.allocated_memory)
    }
}

impl GpuBuffers for HostBuffers {
    fn upload_mesh(&mut self, label: &str, vertices: &[Vertex], indices: &[u32]) -> BufferHandle {
        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;

        let vertex_bytes: Vec<u8> = bytemuck::cast_slice(vertices).to_vec();
        let allocated_memory = (vertex_bytes.len() + std::mem::size_of_val(indices)) as u64;
        self.buffers.insert(
            handle,
            HostBuffer {
                label: label.to_owned(),
                vertex_bytes,
                indices: indices.to_vec(),
                analytics: BufferAnalytics {
                    allocated_memory,
                    times_written: 1,
                },
            },
        );
        log::trace!("Uploaded {label} as {handle:?} ({allocated_memory} bytes)");
        handle
    }

    fn write_indices(&mut self, handle: BufferHandle, indices: &[u32]) {
        let Some(buffer) = self.buffers.get_mut(&handle) else {
            panic!("buffer {handle:?} does not exist");
        };
        if buffer.indices.len() != indices.len() {
            panic!(
                "Index write size mismatch for buffer '{}': {} != {}",
                buffer.label,
                indices.len(),
                buffer.indices.len()
            );
        }
        buffer.indices.copy_from_slice(indices);
        buffer.analytics.times_written += 1;
    }

    fn release(&mut self, handle: BufferHandle) {
        if self.buffers.remove(&handle).is_some() {
            self.released += 1;
        } else {
            log::warn!("Release of unknown buffer {handle:?}");
        }
    }
}
