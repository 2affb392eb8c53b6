//! Asset manager: shared model loading with weak caching
//!
//! Entities share one `Arc<Model>` per source file. The cache only holds
//! `Weak` references, so a model (and, downstream, its GPU resources)
//! dies exactly when the last owning entity does, and a later load of the
//! same path imports it afresh.

use super::model::Model;
use super::model_loader::{self, AssetError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Caching loader for shared model assets
#[derive(Default)]
pub struct AssetManager {
    models: HashMap<PathBuf, Weak<Model>>,
}

impl AssetManager {
    /// Create a new empty asset manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model, reusing the live copy when one exists
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Result<Arc<Model>, AssetError> {
        let path = path.as_ref();

        if let Some(existing) = self.models.get(path).and_then(Weak::upgrade) {
            debug!(path = ?path, "Model cache hit");
            return Ok(existing);
        }

        let model = Arc::new(model_loader::load_model(path)?);
        self.models.insert(path.to_path_buf(), Arc::downgrade(&model));
        info!(
            path = ?path,
            meshes = model.meshes.len(),
            bones = model.bone_count,
            "Imported model"
        );
        Ok(model)
    }

    /// Register an already-built model under a synthetic path
    ///
    /// Lets procedurally generated models (primitives) share through the
    /// same cache as imported ones.
    pub fn insert(&mut self, key: impl Into<PathBuf>, model: &Arc<Model>) {
        self.models.insert(key.into(), Arc::downgrade(model));
    }

    /// Look up a live cached model without loading
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<Model>> {
        self.models.get(path.as_ref()).and_then(Weak::upgrade)
    }

    /// Drop cache entries whose models are gone
    pub fn purge_dead(&mut self) {
        self.models.retain(|_, weak| weak.strong_count() > 0);
    }

    /// Number of cache entries, dead or alive
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
