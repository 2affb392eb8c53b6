//! GPU uniform buffer types
//!
//! Uniform buffer structures matching the WGSL shader definitions, used
//! to pass per-frame, per-object and per-skeleton data to the GPU.

use crate::animation::MAX_BONES;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Per-frame uniform data for the lit pass
///
/// Matches the FrameUniform struct in `lit.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameUniform {
    /// Combined view-projection matrix
    pub view_proj: [[f32; 4]; 4],
    /// Directional light view-projection ("light space") matrix
    pub light_space: [[f32; 4]; 4],
    /// Camera world position (w unused)
    pub camera_pos: [f32; 4],
    /// Directional light direction (w unused)
    pub light_dir: [f32; 4],
    /// Ambient light color (w unused)
    pub ambient: [f32; 4],
    /// Diffuse light color (w unused)
    pub diffuse: [f32; 4],
    /// Specular light color (w unused)
    pub specular: [f32; 4],
    /// x: shadow bias, y: debug normals, z: debug specular, w: unused
    pub params: [f32; 4],
}

impl Default for FrameUniform {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            light_space: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0; 4],
            light_dir: [-0.2, -1.0, -0.3, 0.0],
            ambient: [0.1, 0.1, 0.1, 0.0],
            diffuse: [1.0, 1.0, 1.0, 0.0],
            specular: [0.3, 0.3, 0.3, 0.0],
            params: [0.0005, 0.0, 0.0, 0.0],
        }
    }
}

impl FrameUniform {
    /// Assemble the frame uniform for the lit pass
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        view_proj: Mat4,
        light_space: Mat4,
        camera_pos: Vec3,
        light_dir: Vec3,
        ambient: Vec3,
        diffuse: Vec3,
        specular: Vec3,
        shadow_bias: f32,
        debug_normals: bool,
        debug_specular: bool,
    ) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_space: light_space.to_cols_array_2d(),
            camera_pos: camera_pos.extend(0.0).to_array(),
            light_dir: light_dir.extend(0.0).to_array(),
            ambient: ambient.extend(0.0).to_array(),
            diffuse: diffuse.extend(0.0).to_array(),
            specular: specular.extend(0.0).to_array(),
            params: [
                shadow_bias,
                if debug_normals { 1.0 } else { 0.0 },
                if debug_specular { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

/// Per-frame uniform for the shadow pass: the light-space matrix only
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightSpaceUniform {
    pub light_space: [[f32; 4]; 4],
}

impl LightSpaceUniform {
    pub fn new(light_space: Mat4) -> Self {
        Self {
            light_space: light_space.to_cols_array_2d(),
        }
    }
}

/// Per-object uniform data
///
/// Matches the ObjectUniform struct in `lit.wgsl` and `shadow.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectUniform {
    /// Model (world) matrix
    pub model: [[f32; 4]; 4],
    /// x: shininess, y: skinned, z: receive shadows, w: unused
    pub params: [f32; 4],
}

impl ObjectUniform {
    /// Create a new object uniform
    pub fn new(model: Mat4, shininess: f32, skinned: bool, receive_shadows: bool) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            params: [
                shininess,
                if skinned { 1.0 } else { 0.0 },
                if receive_shadows { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

impl Default for ObjectUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, 32.0, false, true)
    }
}

/// Final bone matrices for one skinned object
///
/// Matches the BoneUniform array in the shaders; always fully populated,
/// identity in unused slots.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BoneUniform {
    pub bones: [[[f32; 4]; 4]; MAX_BONES],
}

impl Default for BoneUniform {
    fn default() -> Self {
        Self {
            bones: [Mat4::IDENTITY.to_cols_array_2d(); MAX_BONES],
        }
    }
}

impl BoneUniform {
    /// Pack a bone matrix slice, identity-filling the tail
    pub fn from_matrices(matrices: &[Mat4]) -> Self {
        let mut uniform = Self::default();
        for (slot, matrix) in uniform.bones.iter_mut().zip(matrices.iter()) {
            *slot = matrix.to_cols_array_2d();
        }
        uniform
    }
}

/// Skybox uniform: projection plus the translation-stripped view matrix
///
/// Matches the SkyboxUniform struct in `skybox.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyboxUniform {
    /// View matrix with the translation removed
    pub view: [[f32; 4]; 4],
    /// Projection matrix
    pub projection: [[f32; 4]; 4],
}

impl SkyboxUniform {
    /// Build from the camera view matrix, stripping its translation
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        let rotation_only = Mat4::from_mat3(glam::Mat3::from_mat4(view));
        Self {
            view: rotation_only.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }
}

/// Helper trait for creating GPU buffers from uniform types
pub trait UniformBuffer: Pod {
    /// Create a GPU buffer containing this uniform data
    fn create_buffer(&self, device: &wgpu::Device, label: Option<&str>) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;

        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label,
            contents: bytemuck::cast_slice(&[*self]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    /// Update an existing buffer with new data
    fn update_buffer(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[*self]));
    }
}

impl UniformBuffer for FrameUniform {}
impl UniformBuffer for LightSpaceUniform {}
impl UniformBuffer for ObjectUniform {}
impl UniformBuffer for BoneUniform {}
impl UniformBuffer for SkyboxUniform {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_uniform_size() {
        use std::mem;
        // Two matrices + six vec4s
        assert_eq!(mem::size_of::<FrameUniform>(), 2 * 64 + 6 * 16);
    }

    #[test]
    fn test_object_uniform_size() {
        use std::mem;
        assert_eq!(mem::size_of::<ObjectUniform>(), 64 + 16);
    }

    #[test]
    fn test_bone_uniform_size() {
        use std::mem;
        assert_eq!(mem::size_of::<BoneUniform>(), 64 * MAX_BONES);
    }

    #[test]
    fn test_bone_uniform_identity_fill() {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        let uniform = BoneUniform::from_matrices(&[Mat4::from_translation(glam::Vec3::X)]);

        assert_ne!(uniform.bones[0], identity);
        for slot in &uniform.bones[1..] {
            assert_eq!(*slot, identity);
        }
    }

    #[test]
    fn test_skybox_uniform_strips_translation() {
        let view = Mat4::from_translation(glam::Vec3::new(5.0, 6.0, 7.0));
        let uniform = SkyboxUniform::new(view, Mat4::IDENTITY);
        // Translation column reset to the origin
        assert_eq!(uniform.view[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_object_uniform_flags() {
        let uniform = ObjectUniform::new(Mat4::IDENTITY, 16.0, true, false);
        assert_eq!(uniform.params, [16.0, 1.0, 0.0, 0.0]);
    }
}
