//! Latch Asset Pipeline
//!
//! Editor-time import of source files (images, glTF/OBJ models, scene
//! references) into engine-ready assets. Every source file gets a stable
//! [`AssetHandle`] persisted in a `.meta` sidecar next to it; models expand
//! into deterministic mesh sub-assets.
//!
//! [`AssetRegistry`] is the synchronous facade, [`AsyncAssetLoader`] runs
//! the same imports on a worker pool.

pub mod asset;
pub mod asset_type;
pub mod config;
pub mod error;
pub mod extensions;
pub mod handle;
pub mod importer;
pub mod metadata;
pub mod registry;
pub mod sidecar;
pub mod store;
pub mod streaming;

#[cfg(test)]
mod test_support;

pub use asset::{
    Asset, AssetRef, MeshAsset, ModelAsset, ModelNode, PixelFormat, SceneAsset, SubMesh,
    TextureAsset, Vertex,
};
pub use asset_type::{AssetType, UnknownAssetType};
pub use config::{AssetPipelineConfig, ModelImportConfig};
pub use error::{AssetError, ConfigError, ImportError, MetadataError};
pub use extensions::{asset_type_from_extension, asset_type_from_path};
pub use handle::AssetHandle;
pub use importer::{AssetImporter, ImporterSet, SubAssetSink};
pub use metadata::{
    AnisotropyLevel, AssetMetadata, ImportSettings, ModelImportSettings, TextureFilter,
    TextureImportSettings, TextureWrap,
};
pub use registry::AssetRegistry;
pub use streaming::AsyncAssetLoader;
