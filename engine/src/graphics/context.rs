//! GPU context: instance, adapter, device and queue
//!
//! One context is created at startup and shared (via `Arc`) by the
//! renderer. Surfaces belong to the surrounding shell; the context only
//! helps configure them.

use std::sync::Arc;
use tracing::info;

/// Errors from GPU context acquisition
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no compatible GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Owner of the GPU device and queue all rendering goes through
pub struct RenderContext {
    /// WebGPU instance the adapter was selected from
    pub instance: wgpu::Instance,
    /// Device for resource creation
    pub device: Arc<wgpu::Device>,
    /// Queue for command submission and texture uploads
    pub queue: Arc<wgpu::Queue>,
    /// Selected adapter, kept for surface capability queries
    adapter: wgpu::Adapter,
    /// Adapter information for diagnostics
    pub adapter_info: wgpu::AdapterInfo,
}

impl RenderContext {
    /// Select an adapter and request a device from it
    ///
    /// `compatible_surface` constrains adapter selection to one that can
    /// present to that surface; headless use passes `None`.
    pub async fn new(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, ContextError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await?;

        let adapter_info = adapter.get_info();
        info!(
            gpu_name = %adapter_info.name,
            backend = ?adapter_info.backend,
            "GPU adapter selected"
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Render Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            instance,
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter,
            adapter_info,
        })
    }

    /// sRGB-preferring format for presenting to a surface
    pub fn preferred_format(&self, surface: &wgpu::Surface) -> wgpu::TextureFormat {
        let caps = surface.get_capabilities(&self.adapter);
        caps.formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .unwrap_or(caps.formats[0])
    }

    /// Initial configuration for presenting to a surface at the given size
    pub fn surface_configuration(
        &self,
        surface: &wgpu::Surface,
        width: u32,
        height: u32,
    ) -> wgpu::SurfaceConfiguration {
        let caps = surface.get_capabilities(&self.adapter);

        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: self.preferred_format(surface),
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    /// Start recording GPU commands
    pub fn create_command_encoder(&self, label: Option<&str>) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label })
    }

    /// Submit recorded command buffers to the queue
    pub fn submit<I: IntoIterator<Item = wgpu::CommandBuffer>>(&self, command_buffers: I) {
        self.queue.submit(command_buffers);
    }
}
