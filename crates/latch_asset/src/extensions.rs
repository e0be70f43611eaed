//! Source file extension → asset type table
//!
//! Only consulted when a source file has no sidecar yet.

use crate::AssetType;
use std::path::Path;

const EXTENSION_TABLE: &[(&str, AssetType)] = &[
    // Engine scene description
    (".epoch", AssetType::Scene),
    // Model sources
    (".fbx", AssetType::Model),
    (".gltf", AssetType::Model),
    (".glb", AssetType::Model),
    (".obj", AssetType::Model),
    // Textures
    (".png", AssetType::Texture),
    (".jpg", AssetType::Texture),
    (".jpeg", AssetType::Texture),
];

/// Look up an extension such as `".png"` (case-insensitive, leading dot optional).
pub fn asset_type_from_extension(extension: &str) -> AssetType {
    let lower = extension.to_ascii_lowercase();
    let key = lower.strip_prefix('.').unwrap_or(&lower);
    EXTENSION_TABLE
        .iter()
        .find(|(ext, _)| &ext[1..] == key)
        .map(|&(_, ty)| ty)
        .unwrap_or(AssetType::None)
}

pub fn asset_type_from_path(path: &Path) -> AssetType {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(asset_type_from_extension)
        .unwrap_or(AssetType::None)
}
