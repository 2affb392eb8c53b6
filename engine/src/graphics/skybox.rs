//! Cubemap skybox drawn after the lit pass

use super::material::TextureData;
use super::texture;
use super::AssetError;
use std::path::{Path, PathBuf};
use tracing::info;
use wgpu::util::DeviceExt;

/// Unit cube positions, one triangle pair per face
#[rustfmt::skip]
const SKYBOX_VERTICES: [f32; 108] = [
    -1.0,  1.0, -1.0,
    -1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,
     1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,

    -1.0, -1.0,  1.0,
    -1.0, -1.0, -1.0,
    -1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,
    -1.0,  1.0,  1.0,
    -1.0, -1.0,  1.0,

     1.0, -1.0, -1.0,
     1.0, -1.0,  1.0,
     1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,
     1.0,  1.0, -1.0,
     1.0, -1.0, -1.0,

    -1.0, -1.0,  1.0,
    -1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,
     1.0, -1.0,  1.0,
    -1.0, -1.0,  1.0,

    -1.0,  1.0, -1.0,
     1.0,  1.0, -1.0,
     1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,
    -1.0,  1.0,  1.0,
    -1.0,  1.0, -1.0,

    -1.0, -1.0, -1.0,
    -1.0, -1.0,  1.0,
     1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,
    -1.0, -1.0,  1.0,
     1.0, -1.0,  1.0,
];

/// Skybox state: the cube geometry, the loaded cubemap, and the toggle
pub struct Skybox {
    /// Cube vertex buffer (position only)
    pub vertex_buffer: wgpu::Buffer,
    /// Loaded cubemap view, `None` until faces are set
    pub cubemap: Option<wgpu::TextureView>,
    /// Cubemap sampler
    pub sampler: wgpu::Sampler,
    /// Face image paths the cubemap was loaded from
    pub face_paths: Option<[PathBuf; 6]>,
    /// Whether the skybox pass runs
    pub enabled: bool,
}

impl Skybox {
    /// Create an empty, enabled skybox
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skybox Vertex Buffer"),
            contents: bytemuck::cast_slice(&SKYBOX_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Skybox Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            vertex_buffer,
            cubemap: None,
            sampler,
            face_paths: None,
            enabled: true,
        }
    }

    /// Load the cubemap from six face images
    /// (+X/-X/+Y/-Y/+Z/-Z order)
    pub fn load_faces(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        paths: [PathBuf; 6],
    ) -> Result<(), AssetError> {
        let faces: [TextureData; 6] = [
            texture::load_image(&paths[0])?,
            texture::load_image(&paths[1])?,
            texture::load_image(&paths[2])?,
            texture::load_image(&paths[3])?,
            texture::load_image(&paths[4])?,
            texture::load_image(&paths[5])?,
        ];

        self.cubemap = Some(texture::upload_cubemap(
            device,
            queue,
            &faces,
            Some("Skybox Cubemap"),
        ));
        info!(faces = ?paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(), "Loaded skybox cubemap");
        self.face_paths = Some(paths);
        Ok(())
    }

    /// Whether the skybox can actually be drawn this frame
    pub fn is_drawable(&self) -> bool {
        self.enabled && self.cubemap.is_some()
    }

    /// Number of vertices in the cube geometry
    pub fn vertex_count() -> u32 {
        (SKYBOX_VERTICES.len() / 3) as u32
    }
}

/// Load six face images from a directory using conventional face names
/// (right/left/top/bottom/front/back with the given extension)
pub fn conventional_face_paths(dir: &Path, extension: &str) -> [PathBuf; 6] {
    ["right", "left", "top", "bottom", "front", "back"]
        .map(|face| dir.join(format!("{face}.{extension}")))
}
