//! Asset metadata and per-type import settings

use crate::{AssetHandle, AssetType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureFilter {
    None,
    #[default]
    Linear,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureWrap {
    None,
    Clamp,
    #[default]
    Wrap,
    Border,
}

/// Anisotropic filtering level, stored in sidecars as an integer 0-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AnisotropyLevel {
    #[default]
    None,
    X2,
    X4,
    X8,
    X16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("anisotropy level {0} is out of range (0-4)")]
pub struct InvalidAnisotropyLevel(pub u8);

impl From<AnisotropyLevel> for u8 {
    fn from(level: AnisotropyLevel) -> Self {
        match level {
            AnisotropyLevel::None => 0,
            AnisotropyLevel::X2 => 1,
            AnisotropyLevel::X4 => 2,
            AnisotropyLevel::X8 => 3,
            AnisotropyLevel::X16 => 4,
        }
    }
}

impl TryFrom<u8> for AnisotropyLevel {
    type Error = InvalidAnisotropyLevel;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(AnisotropyLevel::None),
            1 => Ok(AnisotropyLevel::X2),
            2 => Ok(AnisotropyLevel::X4),
            3 => Ok(AnisotropyLevel::X8),
            4 => Ok(AnisotropyLevel::X16),
            other => Err(InvalidAnisotropyLevel(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TextureImportSettings {
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    pub generate_mips: bool,
    #[serde(rename = "AnisotropyLevel")]
    pub anisotropy: AnisotropyLevel,
}

/// When the hierarchy is flattened the model ends up with a single node and a
/// single combined mesh; otherwise the hierarchy mirrors the source scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ModelImportSettings {
    pub flatten_hierarchy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportSettings {
    #[default]
    None,
    Texture(TextureImportSettings),
    Model(ModelImportSettings),
}

impl ImportSettings {
    pub fn default_for(asset_type: AssetType) -> Self {
        match asset_type {
            AssetType::Texture => ImportSettings::Texture(TextureImportSettings::default()),
            AssetType::Model => ImportSettings::Model(ModelImportSettings::default()),
            AssetType::None | AssetType::Mesh | AssetType::Material | AssetType::Scene => {
                ImportSettings::None
            }
        }
    }

    pub fn texture(&self) -> Option<&TextureImportSettings> {
        match self {
            ImportSettings::Texture(settings) => Some(settings),
            _ => None,
        }
    }

    pub fn model(&self) -> Option<&ModelImportSettings> {
        match self {
            ImportSettings::Model(settings) => Some(settings),
            _ => None,
        }
    }
}

/// Persistent description of how to locate and import an asset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssetMetadata {
    pub handle: AssetHandle,
    pub asset_type: AssetType,
    pub is_memory_only: bool,
    /// Source path relative to the asset root, or the display name of a
    /// memory-only asset.
    pub path: PathBuf,
    pub import_settings: ImportSettings,
}

impl AssetMetadata {
    /// File-backed metadata with default import settings for `asset_type`.
    pub fn new(handle: AssetHandle, asset_type: AssetType, path: impl Into<PathBuf>) -> Self {
        Self {
            handle,
            asset_type,
            is_memory_only: false,
            path: path.into(),
            import_settings: ImportSettings::default_for(asset_type),
        }
    }

    pub fn memory_only(handle: AssetHandle, asset_type: AssetType, name: Option<&str>) -> Self {
        Self {
            handle,
            asset_type,
            is_memory_only: true,
            path: name.map(PathBuf::from).unwrap_or_default(),
            import_settings: ImportSettings::None,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.asset_type != AssetType::None
    }
}
