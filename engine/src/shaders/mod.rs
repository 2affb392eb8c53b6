//! Shader management
//!
//! Provides access to the WGSL sources for the render pipelines. Sources
//! are embedded at build time, so malformed shader code fails compilation
//! instead of the frame loop.

/// Forward lighting pass with shadow sampling and skinning
pub const LIT_SHADER: &str = include_str!("lit.wgsl");

/// Depth-only shadow pass with skinning
pub const SHADOW_SHADER: &str = include_str!("shadow.wgsl");

/// Cubemap skybox background
pub const SKYBOX_SHADER: &str = include_str!("skybox.wgsl");

/// Fullscreen triangle blit of the viewport texture
pub const BLIT_SHADER: &str = include_str!("blit.wgsl");
