//! # Camera State Management
//!
//! The viewer the world streams and sorts against. Anything that can report a
//! world position and an aspect ratio can drive the engine through
//! [`ViewerProvider`]; [`ViewerState`] is the built-in camera-backed viewer.

use cgmath::{Matrix4, Point3, Vector3};

use camera::{Camera, Projection};

pub mod camera;

/// Source of the viewer position and aspect ratio.
pub trait ViewerProvider {
    fn viewer_position(&self) -> Point3<f32>;
    fn aspect_ratio(&self) -> f32;
}

/// A camera plus its projection.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewerState {
    pub camera: Camera,
    pub projection: Projection,
}

impl ViewerState {
    pub fn new(camera: Camera, projection: Projection) -> Self {
        ViewerState { camera, projection }
    }

    /// Combined projection and view matrix for the renderer.
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.camera.calc_matrix()
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.camera.forward()
    }
}

impl ViewerProvider for ViewerState {
    fn viewer_position(&self) -> Point3<f32> {
        self.camera.position
    }

    fn aspect_ratio(&self) -> f32 {
        self.projection.aspect()
    }
}
