//! # Camera Implementation
//!
//! This module contains the viewer's camera:
//! - `Camera`: position and orientation in world space
//! - `Projection`: perspective projection settings
//!
//! Yaw is measured from +X toward +Z; pitch is clamped short of straight up
//! or down.

use cgmath::*;
use std::f32::consts::FRAC_PI_2;

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// A first-person camera in 3D space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    /// The camera's position in world space
    pub position: Point3<f32>,
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation (around X axis) in radians
    pub pitch: Rad<f32>,
}

impl Camera {
    /// Creates a new camera with the specified position and orientation.
    ///
    /// # Example
    /// ```ignore
    /// use cgmath::{Point3, Deg};
    /// let camera = Camera::new(
    ///     Point3::new(0.0, 0.0, 0.0),  // Position at origin
    ///     Deg(0.0),                     // Facing along positive X
    ///     Deg(0.0),                     // Level horizon
    /// );
    /// ```
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        let mut camera = Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        };
        camera.clamp_pitch();
        camera
    }

    /// The normalized direction the camera is facing.
    pub fn forward(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.0.sin_cos();
        Vector3::new(pitch_cos * yaw_cos, pitch_sin, pitch_cos * yaw_sin).normalize()
    }

    /// Calculates the view matrix for this camera.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }

    /// Moves the camera by a world-space offset.
    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }

    /// Turns the camera by the given yaw and pitch deltas.
    pub fn rotate<Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(&mut self, yaw: Y, pitch: P) {
        self.yaw += yaw.into();
        self.pitch += pitch.into();
        self.clamp_pitch();
    }

    fn clamp_pitch(&mut self) {
        if self.pitch < -Rad(SAFE_FRAC_PI_2) {
            self.pitch = -Rad(SAFE_FRAC_PI_2);
        } else if self.pitch > Rad(SAFE_FRAC_PI_2) {
            self.pitch = Rad(SAFE_FRAC_PI_2);
        }
    }
}

/// Represents a camera's projection matrix and related parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Projection {
    /// Aspect ratio (width / height)
    aspect: f32,
    /// Vertical field of view in radians
    fovy: Rad<f32>,
    /// Near clipping plane distance
    znear: f32,
    /// Far clipping plane distance
    zfar: f32,
}

impl Projection {
    /// Creates a new projection with the given parameters.
    ///
    /// # Arguments
    /// * `width` - Viewport width in pixels
    /// * `height` - Viewport height in pixels
    /// * `fovy` - Vertical field of view (can be any type convertible to `Rad<f32>`)
    /// * `znear` - Near clipping plane distance
    /// * `zfar` - Far clipping plane distance
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Updates the projection's aspect ratio for viewport resizing.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Calculates the projection matrix.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_follows_yaw() {
        let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        assert!((camera.forward() - Vector3::unit_x()).magnitude() < 1e-6);
        let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(90.0), Deg(0.0));
        assert!((camera.forward() - Vector3::unit_z()).magnitude() < 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        camera.rotate(Deg(0.0), Deg(120.0));
        assert!(camera.pitch.0 < FRAC_PI_2);
        assert!(camera.forward().y > 0.99);
    }

    #[test]
    fn test_projection_resize() {
        let mut projection = Projection::new(800, 600, Deg(70.0), 0.1, 500.0);
        assert!((projection.aspect() - 800.0 / 600.0).abs() < 1e-6);
        projection.resize(1000, 500);
        assert!((projection.aspect() - 2.0).abs() < 1e-6);
    }
}
