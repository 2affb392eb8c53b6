//! Camera component
//!
//! Projection parameters live on the entity as plain data; the view
//! matrix is derived from the transform graph (the inverse of the
//! camera's world matrix), so a camera parented to another entity moves
//! with it like anything else in the scene.

use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Projection shape of a camera
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ProjectionMode {
    /// Perspective projection with the given vertical field of view in radians
    Perspective {
        fov_y_radians: f32,
    },
    /// Orthographic projection with the given view height in world units
    Orthographic {
        height: f32,
    },
}

/// Camera component holding projection parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Camera {
    /// Projection shape and its parameter
    pub projection: ProjectionMode,
    /// Width / height; the renderer refreshes this from the viewport size
    pub aspect_ratio: f32,
    /// Near clipping plane distance
    pub z_near: f32,
    /// Far clipping plane distance
    pub z_far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl Camera {
    /// Perspective camera from a vertical field of view in degrees
    pub fn perspective(fov_y_degrees: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            projection: ProjectionMode::Perspective {
                fov_y_radians: fov_y_degrees.to_radians(),
            },
            aspect_ratio,
            z_near,
            z_far,
        }
    }

    /// Orthographic camera of the given view height in world units
    pub fn orthographic(height: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            projection: ProjectionMode::Orthographic { height },
            aspect_ratio,
            z_near,
            z_far,
        }
    }

    /// Projection matrix for the current parameters
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            ProjectionMode::Perspective { fov_y_radians } => {
                Mat4::perspective_rh(fov_y_radians, self.aspect_ratio, self.z_near, self.z_far)
            }
            ProjectionMode::Orthographic { height } => {
                let half_height = height * 0.5;
                let half_width = half_height * self.aspect_ratio;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.z_near,
                    self.z_far,
                )
            }
        }
    }

    /// View matrix from the camera's world transform
    pub fn view_matrix(world_matrix: Mat4) -> Mat4 {
        world_matrix.inverse()
    }

    /// Combined view-projection matrix
    pub fn view_projection_matrix(&self, world_matrix: Mat4) -> Mat4 {
        self.projection_matrix() * Self::view_matrix(world_matrix)
    }

    /// Refresh the aspect ratio after a viewport resize
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }
}
