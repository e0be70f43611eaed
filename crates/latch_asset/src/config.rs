//! Asset pipeline settings

use crate::error::ConfigError;
use latch_core::fs::{FileSystem, FsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Asset pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPipelineConfig {
    /// Directory all asset paths are relative to.
    pub asset_root: PathBuf,
    /// Extension appended to a source path to name its sidecar.
    pub meta_extension: String,
    /// Async loader worker count, 0 picks one per core.
    pub worker_threads: usize,
    pub model: ModelImportConfig,
}

/// Scene decoder post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelImportConfig {
    pub unit_scale: f32,
    pub left_handed: bool,
    pub generate_normals: bool,
    pub generate_tangents: bool,
    pub join_identical_vertices: bool,
}

impl Default for AssetPipelineConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            meta_extension: "meta".to_string(),
            worker_threads: 0,
            model: ModelImportConfig::default(),
        }
    }
}

impl Default for ModelImportConfig {
    fn default() -> Self {
        Self {
            unit_scale: 1.0,
            left_handed: true,
            generate_normals: true,
            generate_tangents: true,
            join_identical_vertices: true,
        }
    }
}

impl AssetPipelineConfig {
    pub const FILE_NAME: &'static str = "latch_assets.json";

    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs.read(path)?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(fs: &dyn FileSystem, path: &Path) -> Result<Self, ConfigError> {
        match Self::load(fs, path) {
            Err(ConfigError::Fs(FsError::NotFound(_))) => {
                tracing::info!("No {} found, using default asset settings", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save(&self, fs: &dyn FileSystem, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self).map_err(ConfigError::Encode)?;
        fs.write(path, text.as_bytes())?;
        Ok(())
    }
}
