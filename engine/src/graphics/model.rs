//! Model asset: meshes, materials and the bone table
//!
//! A model is immutable after import and shared across entities with
//! `Arc`. GPU buffers are created by the renderer, keyed on the model id,
//! and dropped once the last owning entity is gone.

use super::material::Material;
use super::mesh::MeshData;
use crate::animation::BoneInfoMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identifier for a loaded model, used as the GPU cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub u64);

/// An imported mesh/material asset
#[derive(Debug)]
pub struct Model {
    /// Cache key, unique per loaded model
    pub id: ModelId,
    /// Display name, usually the file stem
    pub name: String,
    /// Source path, if the model came from a file
    pub path: Option<PathBuf>,
    /// Mesh list, each referencing a material slot
    pub meshes: Vec<MeshData>,
    /// Materials referenced by the meshes
    pub materials: Vec<Material>,
    /// Bone name -> (index, offset matrix) table for skinning
    pub bone_info: BoneInfoMap,
    /// Number of bones found during import
    pub bone_count: usize,
}

impl Model {
    /// Assemble a model from already-imported parts
    pub fn new(
        name: impl Into<String>,
        meshes: Vec<MeshData>,
        materials: Vec<Material>,
        bone_info: BoneInfoMap,
    ) -> Self {
        let bone_count = bone_info.len();
        let materials = if materials.is_empty() {
            vec![Material::default()]
        } else {
            materials
        };
        Self {
            id: ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            path: None,
            meshes,
            materials,
            bone_info,
            bone_count,
        }
    }

    /// Build a model from a single primitive mesh and material
    pub fn from_mesh(mesh: MeshData, material: Material) -> Self {
        Self::new("primitive", vec![mesh], vec![material], BoneInfoMap::new())
    }

    /// Whether any mesh carries bone weights
    pub fn is_skinned(&self) -> bool {
        !self.bone_info.is_empty()
    }

    /// Total vertex count across all meshes
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }
}
