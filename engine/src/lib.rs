//! Scene and rendering core for a small 3D editor engine
//!
//! This crate provides the entity/component scene graph, hierarchical
//! transforms, skeletal animation playback, and the two-pass
//! (shadow + lit) forward renderer. Window creation and GUI layout are
//! left to the surrounding application, which receives the viewport
//! texture each frame and drives the core through plain method calls.

pub mod animation;
pub mod config;
pub mod core;
pub mod graphics;
pub mod scene;
pub mod shaders;

// Re-export commonly used types
pub mod prelude {
    // Scene graph types
    pub use crate::scene::{
        Active, Entity, ModelComponent, Registry, Relationship, ReparentPolicy, Scene, Transform,
    };

    // Camera types
    pub use crate::core::camera::{Camera, ProjectionMode};

    // Math types
    pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

    // Animation types
    pub use crate::animation::{
        Animation, Animator, AnimatorComponent, BoneInfo, BoneInfoMap, MAX_BONES,
    };

    // Graphics types
    pub use crate::graphics::{
        AssetError, AssetManager, Material, MeshData, Model, RenderContext, RenderSettings,
        Renderer, Vertex,
    };

    // Config types
    pub use crate::config::AssetConfig;

    pub use wgpu;
    pub use winit;
}

/// Initialize logging for the engine
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wgpu_core=warn,wgpu_hal=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
