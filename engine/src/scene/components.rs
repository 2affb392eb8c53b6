//! Core components attached to scene entities

use crate::graphics::Model;
use glam::{Mat4, Quat, Vec3};
use hecs::Entity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Tag component marking whether an entity participates in update/render
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Active(pub bool);

impl Default for Active {
    fn default() -> Self {
        Self(true)
    }
}

/// Parent-child relationship component
///
/// Invariant: if A lists B in `children`, B's `parent` is A. Both sides
/// are updated together by `hierarchy::set_parent`; nothing else mutates
/// these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationship {
    /// Parent entity, if any
    pub parent: Option<Entity>,
    /// Child entities in insertion order (display/traversal order)
    pub children: Vec<Entity>,
}

/// Transform component with lazily cached local and world matrices
///
/// The position/rotation/scale fields are authoritative; the two matrix
/// caches are rebuilt on read when their dirty flag is set. Writes must go
/// through the `Scene`/`hierarchy` setters so descendants get their world
/// caches invalidated.
#[derive(Debug, Clone)]
pub struct Transform {
    /// Position relative to the parent
    pub local_position: Vec3,
    /// Rotation relative to the parent
    pub local_rotation: Quat,
    /// Scale relative to the parent
    pub local_scale: Vec3,

    /// Cached translation * rotation * scale matrix
    pub local_matrix: Mat4,
    /// Cached parent-world * local matrix
    pub world_matrix: Mat4,
    /// Set when position/rotation/scale changed since `local_matrix` was built
    pub local_dirty: bool,
    /// Set when this entity's local matrix or any ancestor's world matrix changed
    pub world_dirty: bool,

    /// Entity that owns this component
    pub owner: Entity,
}

impl Transform {
    /// Create a default transform owned by the given entity
    pub fn new(owner: Entity) -> Self {
        Self {
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            local_scale: Vec3::ONE,
            local_matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            local_dirty: true,
            world_dirty: true,
            owner,
        }
    }

    /// Create a transform at the given position
    pub fn from_position(owner: Entity, position: Vec3) -> Self {
        Self {
            local_position: position,
            ..Self::new(owner)
        }
    }

    /// Set the scale of the transform
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.local_scale = scale;
        self
    }

    /// Set the rotation of the transform
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.local_rotation = rotation;
        self
    }

    /// Forward direction of the local rotation (rotated -Z, normalized)
    pub fn forward(&self) -> Vec3 {
        (self.local_rotation * Vec3::NEG_Z).normalize()
    }

    /// Right direction of the local rotation (rotated +X, normalized)
    pub fn right(&self) -> Vec3 {
        (self.local_rotation * Vec3::X).normalize()
    }

    /// Up direction of the local rotation (rotated +Y, normalized)
    pub fn up(&self) -> Vec3 {
        (self.local_rotation * Vec3::Y).normalize()
    }
}

/// Model component referencing a shared mesh/material asset
///
/// Several entities may hold the same `Arc<Model>`; the asset and its GPU
/// resources are released when the last holder is destroyed.
#[derive(Debug, Clone)]
pub struct ModelComponent {
    /// Shared model asset; `None` when the import failed or nothing is assigned
    pub model: Option<Arc<Model>>,
    /// Source path the model was imported from
    pub model_path: Option<PathBuf>,
    /// Specular exponent used by the lit pass
    pub shininess: f32,
    /// Whether this entity is drawn into the shadow map
    pub cast_shadows: bool,
    /// Whether the lit pass samples the shadow map for this entity
    pub receive_shadows: bool,
}

impl Default for ModelComponent {
    fn default() -> Self {
        Self {
            model: None,
            model_path: None,
            shininess: 32.0,
            cast_shadows: true,
            receive_shadows: true,
        }
    }
}

impl ModelComponent {
    /// Create a component holding the given shared model
    pub fn new(model: Arc<Model>) -> Self {
        Self {
            model: Some(model),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_entity() -> Entity {
        let mut world = hecs::World::new();
        world.spawn(())
    }

    #[test]
    fn test_transform_defaults() {
        let transform = Transform::new(dummy_entity());
        assert_eq!(transform.local_position, Vec3::ZERO);
        assert_eq!(transform.local_rotation, Quat::IDENTITY);
        assert_eq!(transform.local_scale, Vec3::ONE);
        assert!(transform.local_dirty);
        assert!(transform.world_dirty);
    }

    #[test]
    fn test_directional_vectors_identity() {
        let transform = Transform::new(dummy_entity());
        assert_eq!(transform.forward(), Vec3::NEG_Z);
        assert_eq!(transform.right(), Vec3::X);
        assert_eq!(transform.up(), Vec3::Y);
    }

    #[test]
    fn test_directional_vectors_rotated() {
        let owner = dummy_entity();
        // 90 degrees around +Y turns forward (-Z) into -X
        let transform =
            Transform::new(owner).with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        assert!(transform.forward().abs_diff_eq(Vec3::NEG_X, 1e-6));
        assert!(transform.right().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(transform.up().abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn test_active_default() {
        assert_eq!(Active::default(), Active(true));
    }

    #[test]
    fn test_model_component_defaults() {
        let model = ModelComponent::default();
        assert!(model.model.is_none());
        assert_eq!(model.shininess, 32.0);
        assert!(model.cast_shadows);
        assert!(model.receive_shadows);
    }

    #[test]
    fn test_relationship_default_is_root() {
        let rel = Relationship::default();
        assert!(rel.parent.is_none());
        assert!(rel.children.is_empty());
    }
}
