//! Graphics module
//!
//! Provides rendering functionality: meshes, materials, model import,
//! the shared-asset manager, and the two-pass forward renderer.

pub mod assets;
pub mod context;
pub mod material;
pub mod mesh;
pub mod model;
pub mod model_loader;
pub mod pipeline;
pub mod render_target;
pub mod renderer;
pub mod shadow;
pub mod skybox;
pub mod texture;
pub mod uniform;

// Re-export commonly used types
pub use assets::AssetManager;
pub use context::RenderContext;
pub use material::{Material, MaterialUniform, TextureData};
pub use mesh::{MeshData, Vertex};
pub use model::{Model, ModelId};
pub use model_loader::{load_model, AssetError};
pub use render_target::RenderTarget;
pub use renderer::{RenderSettings, Renderer};
pub use shadow::ShadowMap;
pub use skybox::Skybox;
pub use uniform::{
    BoneUniform, FrameUniform, LightSpaceUniform, ObjectUniform, SkyboxUniform, UniformBuffer,
};
