//! Shadow map: depth-only target and light-space matrix for one
//! directional light

use glam::{Mat4, Vec3};

/// Offscreen depth map rendered from the light's point of view
///
/// Sized independently of the viewport; the lit pass samples it through a
/// comparison sampler.
pub struct ShadowMap {
    /// Depth texture
    pub texture: wgpu::Texture,
    /// View bound as the shadow pass depth attachment and sampled by the
    /// lit pass
    pub view: wgpu::TextureView,
    /// Comparison sampler for shadow tests
    pub sampler: wgpu::Sampler,
    /// Map resolution (square)
    pub size: u32,
}

impl ShadowMap {
    /// Create a shadow map of the given square resolution
    pub fn new(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map Texture"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            size,
        }
    }

    /// Resize the shadow map
    pub fn resize(&mut self, device: &wgpu::Device, size: u32) {
        if self.size == size || size == 0 {
            return;
        }
        *self = Self::new(device, size);
    }
}

/// View-projection matrix of a directional light: an orthographic box
/// centered on the scene origin, looking down the light direction
pub fn light_space_matrix(
    light_dir: Vec3,
    light_distance: f32,
    ortho_size: f32,
    near: f32,
    far: f32,
) -> Mat4 {
    let projection = Mat4::orthographic_rh(
        -ortho_size,
        ortho_size,
        -ortho_size,
        ortho_size,
        near,
        far,
    );
    let direction = light_dir.normalize_or_zero();
    let view = Mat4::look_at_rh(-direction * light_distance, Vec3::ZERO, Vec3::Y);
    projection * view
}
