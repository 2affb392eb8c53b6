//! Entity scene graph
//!
//! This module provides the entity store, the component set, the
//! hierarchical transform graph, and the scene lifecycle operations
//! (create/duplicate/destroy/reparent) built on top of them.

pub mod components;
pub mod hierarchy;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod scene;

// Re-export commonly used types
pub use components::{Active, ModelComponent, Relationship, Transform};
pub use hierarchy::{ReparentPolicy, MAX_HIERARCHY_DEPTH};
pub use registry::Registry;
pub use scene::Scene;

// Re-export hecs types that users will need
pub use hecs::Entity;
