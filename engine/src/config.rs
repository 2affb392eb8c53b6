//! Configuration types for the engine

use std::path::PathBuf;
use tracing::debug;

/// Configuration for asset paths
#[derive(Debug, Clone)]
pub struct AssetConfig {
    /// Root directory for all assets
    pub asset_root: PathBuf,
    /// Directory name for models (relative to asset_root)
    pub models_dir: String,
    /// Directory name for animation clips (relative to asset_root)
    pub animations_dir: String,
    /// Directory name for skybox face images (relative to asset_root)
    pub skybox_dir: String,
}

impl AssetConfig {
    /// Create a new AssetConfig with custom paths
    pub fn new(
        asset_root: PathBuf,
        models_dir: String,
        animations_dir: String,
        skybox_dir: String,
    ) -> Self {
        debug!(
            asset_root = ?asset_root,
            models_dir = models_dir,
            animations_dir = animations_dir,
            skybox_dir = skybox_dir,
            "Creating new AssetConfig"
        );
        Self {
            asset_root,
            models_dir,
            animations_dir,
            skybox_dir,
        }
    }

    /// Get the full path to a model file
    pub fn model_path(&self, file_name: &str) -> PathBuf {
        Self::validate_name(file_name);
        let path = self.asset_root.join(&self.models_dir).join(file_name);
        debug!(file_name = file_name, path = ?path, "Generated model path");
        path
    }

    /// Get the full path to an animation file
    pub fn animation_path(&self, file_name: &str) -> PathBuf {
        Self::validate_name(file_name);
        let path = self.asset_root.join(&self.animations_dir).join(file_name);
        debug!(file_name = file_name, path = ?path, "Generated animation path");
        path
    }

    /// Get the full paths to the six skybox face images, in the
    /// right/left/top/bottom/front/back order cubemap uploads expect.
    pub fn skybox_paths(&self, face_names: &[String; 6]) -> [PathBuf; 6] {
        let dir = self.asset_root.join(&self.skybox_dir);
        face_names.each_ref().map(|name| {
            Self::validate_name(name);
            dir.join(name)
        })
    }

    // Validate name to prevent path traversal attacks
    fn validate_name(name: &str) {
        if name.contains("..") || name.contains('/') || name.contains('\\') {
            panic!("Invalid asset name: {name}");
        }
    }

    /// Check if the asset directories exist
    pub fn validate(&self) -> Result<(), std::io::Error> {
        if !self.asset_root.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Asset root directory not found: {:?}", self.asset_root),
            ));
        }

        let models_path = self.asset_root.join(&self.models_dir);
        if !models_path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Models directory not found: {models_path:?}"),
            ));
        }

        Ok(())
    }
}

impl Default for AssetConfig {
    /// Default configuration that matches the current project structure
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            models_dir: "models".to_string(),
            animations_dir: "animations".to_string(),
            skybox_dir: "skybox".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_config_model_path() {
        let config = AssetConfig {
            asset_root: PathBuf::from("sandbox/assets"),
            ..Default::default()
        };

        let path = config.model_path("vampire.glb");
        assert_eq!(path, PathBuf::from("sandbox/assets/models/vampire.glb"));
    }

    #[test]
    fn test_asset_config_animation_path() {
        let config = AssetConfig::default();
        let path = config.animation_path("walk.glb");
        assert_eq!(path, PathBuf::from("assets/animations/walk.glb"));
    }

    #[test]
    #[should_panic(expected = "Invalid asset name: ../evil")]
    fn test_asset_config_rejects_path_traversal_parent() {
        let config = AssetConfig::default();
        config.model_path("../evil");
    }

    #[test]
    #[should_panic(expected = "Invalid asset name: some/path/evil")]
    fn test_asset_config_rejects_path_traversal_slash() {
        let config = AssetConfig::default();
        config.animation_path("some/path/evil");
    }

    #[test]
    fn test_default_config() {
        let config = AssetConfig::default();
        assert_eq!(config.asset_root, PathBuf::from("assets"));
        assert_eq!(config.models_dir, "models");
        assert_eq!(config.animations_dir, "animations");
        assert_eq!(config.skybox_dir, "skybox");
    }
}
