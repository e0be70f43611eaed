//! Sidecar metadata files
//!
//! Every file-backed asset has a `<source>.meta` JSON document next to it:
//!
//! ```json
//! {
//!   "Handle": 123,
//!   "Type": "Model",
//!   "ImportSettings": { "FlattenHierarchy": false },
//!   "SubAssets": [ { "Handle": 456, "Type": "Mesh", "Name": "Cube" } ]
//! }
//! ```

use crate::error::MetadataError;
use crate::metadata::{AssetMetadata, ImportSettings};
use crate::{AssetHandle, AssetType};
use latch_core::fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Summary of one direct sub-asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubAssetRecord {
    pub handle: AssetHandle,
    #[serde(rename = "Type")]
    pub asset_type: AssetType,
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetaDocument {
    handle: AssetHandle,
    #[serde(rename = "Type")]
    type_name: String,
    #[serde(default)]
    import_settings: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sub_assets: Vec<SubAssetRecord>,
}

/// Decoded contents of a sidecar file.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaFile {
    /// `path` is empty; the caller knows where the source lives.
    pub metadata: AssetMetadata,
    pub sub_assets: Vec<SubAssetRecord>,
}

fn settings_to_value(
    metadata: &AssetMetadata,
) -> Result<serde_json::Value, serde_json::Error> {
    match &metadata.import_settings {
        ImportSettings::None => Ok(serde_json::Value::Object(Default::default())),
        ImportSettings::Texture(settings) => serde_json::to_value(settings),
        ImportSettings::Model(settings) => serde_json::to_value(settings),
    }
}

fn settings_from_value(
    asset_type: AssetType,
    value: serde_json::Value,
) -> Result<ImportSettings, serde_json::Error> {
    if value.is_null() {
        return Ok(ImportSettings::default_for(asset_type));
    }
    Ok(match asset_type {
        AssetType::Texture => ImportSettings::Texture(serde_json::from_value(value)?),
        AssetType::Model => ImportSettings::Model(serde_json::from_value(value)?),
        AssetType::None | AssetType::Mesh | AssetType::Material | AssetType::Scene => {
            ImportSettings::None
        }
    })
}

pub fn to_string(
    metadata: &AssetMetadata,
    sub_assets: &[SubAssetRecord],
) -> Result<String, MetadataError> {
    let encode = |source| MetadataError::Encode {
        handle: metadata.handle,
        source,
    };
    let document = MetaDocument {
        handle: metadata.handle,
        type_name: metadata.asset_type.as_str().to_owned(),
        import_settings: settings_to_value(metadata).map_err(encode)?,
        sub_assets: sub_assets.to_vec(),
    };
    serde_json::to_string_pretty(&document).map_err(encode)
}

/// Parse sidecar text. `origin` is only used for error reporting.
pub fn from_str(text: &str, origin: &Path) -> Result<MetaFile, MetadataError> {
    from_slice(text.as_bytes(), origin)
}

/// Parse raw sidecar bytes. Invalid UTF-8 is a parse error.
pub fn from_slice(bytes: &[u8], origin: &Path) -> Result<MetaFile, MetadataError> {
    let document: MetaDocument =
        serde_json::from_slice(bytes).map_err(|source| MetadataError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

    let asset_type: AssetType =
        document
            .type_name
            .parse()
            .map_err(|_| MetadataError::InvalidType {
                path: origin.to_path_buf(),
                type_name: document.type_name.clone(),
            })?;
    if asset_type == AssetType::None {
        return Err(MetadataError::InvalidType {
            path: origin.to_path_buf(),
            type_name: document.type_name,
        });
    }
    if !document.handle.is_valid() {
        return Err(MetadataError::InvalidHandle {
            path: origin.to_path_buf(),
        });
    }

    let import_settings =
        settings_from_value(asset_type, document.import_settings).map_err(|source| {
            MetadataError::Settings {
                path: origin.to_path_buf(),
                asset_type,
                source,
            }
        })?;

    Ok(MetaFile {
        metadata: AssetMetadata {
            handle: document.handle,
            asset_type,
            is_memory_only: false,
            path: PathBuf::new(),
            import_settings,
        },
        sub_assets: document.sub_assets,
    })
}

pub fn read(fs: &dyn FileSystem, meta_path: &Path) -> Result<MetaFile, MetadataError> {
    let bytes = fs.read(meta_path)?;
    from_slice(&bytes, meta_path)
}

pub fn write(
    fs: &dyn FileSystem,
    meta_path: &Path,
    metadata: &AssetMetadata,
    sub_assets: &[SubAssetRecord],
) -> Result<(), MetadataError> {
    let text = to_string(metadata, sub_assets)?;
    fs.write(meta_path, text.as_bytes())?;
    tracing::debug!("Wrote metadata {}", meta_path.display());
    Ok(())
}
