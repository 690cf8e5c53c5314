//! Vertex data structures and layouts for voxel rendering.
//!
//! This module defines the vertex format written into chunk vertex buffers and
//! the attribute layout an external renderer binds it with.

use cgmath::Point3;

/// A vertex in the voxel rendering pipeline.
///
/// Positions are relative to the chunk origin; the per-chunk model transform
/// moves them into world space.
///
/// # Memory Layout
/// - Position: 3x f32 (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Packed Light: u32 (4 bytes)
///
/// Total size: 24 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in chunk-local space
    pub position: [f32; 3],
    /// UV texture coordinates in atlas space (normalized 0.0-1.0)
    pub tex_coords: [f32; 2],
    /// Packed light of the cell the face looks into
    pub light: u32,
}

/// Scalar format of a vertex attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x3,
    Float32x2,
    Uint32,
}

/// Location and byte offset of one attribute inside [`Vertex`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub offset: usize,
    pub shader_location: u32,
    pub format: VertexFormat,
}

impl Vertex {
    /// Shader attribute layout of a vertex.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    /// - `location = 1`: tex_coords (vec2<f32>)
    /// - `location = 2`: light (u32)
    pub const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: VertexFormat::Float32x3,
        },
        VertexAttribute {
            offset: std::mem::size_of::<[f32; 3]>(),
            shader_location: 1,
            format: VertexFormat::Float32x2,
        },
        VertexAttribute {
            offset: std::mem::size_of::<[f32; 5]>(),
            shader_location: 2,
            format: VertexFormat::Uint32,
        },
    ];

    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `position` - Chunk-local position
    /// * `tex_coords` - Atlas UV coordinates
    /// * `light` - Packed light value
    pub fn new(position: Point3<f32>, tex_coords: [f32; 2], light: u32) -> Self {
        Vertex {
            position: position.into(),
            tex_coords,
            light,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        Point3::from(self.position)
    }
}
