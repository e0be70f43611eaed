//! Importer dispatch
//!
//! One [`AssetImporter`] per asset type, held in an [`ImporterSet`] built at
//! startup. Importers read sources through an [`ImportContext`] and report
//! derived assets through a [`SubAssetSink`]; they never touch the registry.

pub mod decode;
pub mod model;
pub mod scene_ref;
pub mod texture;

use crate::asset::Asset;
use crate::config::ModelImportConfig;
use crate::error::ImportError;
use crate::metadata::AssetMetadata;
use crate::{AssetHandle, AssetType};
use latch_core::fs::FileSystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use model::ModelImporter;
pub use scene_ref::SceneImporter;
pub use texture::TextureImporter;

/// What an importer may see of the outside world.
pub struct ImportContext<'a> {
    pub fs: &'a dyn FileSystem,
    pub asset_root: &'a Path,
}

impl<'a> ImportContext<'a> {
    pub fn new(fs: &'a dyn FileSystem, asset_root: &'a Path) -> Self {
        Self { fs, asset_root }
    }

    /// File system path of the asset's source file.
    pub fn source_path(&self, metadata: &AssetMetadata) -> PathBuf {
        self.asset_root.join(&metadata.path)
    }

    pub fn read_source(&self, metadata: &AssetMetadata) -> Result<Vec<u8>, ImportError> {
        Ok(self.fs.read(&self.source_path(metadata))?)
    }
}

/// Receives sub-assets discovered during an import.
pub trait SubAssetSink {
    /// Record `asset` as a sub-asset of `parent` and return its handle.
    ///
    /// A valid handle already carried by `asset` is kept; otherwise a fresh
    /// one is generated.
    fn add_sub_asset(&mut self, parent: AssetHandle, asset: Asset, name: &str) -> AssetHandle;
}

#[derive(Debug, Clone)]
pub struct PendingSubAsset {
    pub parent: AssetHandle,
    pub asset: Asset,
    pub name: String,
}

/// Sub-assets collected during one import, committed by the registry once
/// the import succeeds.
#[derive(Debug, Default)]
pub struct SubAssetBatch {
    pending: Vec<PendingSubAsset>,
}

impl SubAssetBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn into_vec(self) -> Vec<PendingSubAsset> {
        self.pending
    }
}

impl SubAssetSink for SubAssetBatch {
    fn add_sub_asset(&mut self, parent: AssetHandle, mut asset: Asset, name: &str) -> AssetHandle {
        let handle = if asset.handle().is_valid() {
            asset.handle()
        } else {
            let handle = AssetHandle::generate();
            asset.set_handle(handle);
            handle
        };
        self.pending.push(PendingSubAsset {
            parent,
            asset,
            name: name.to_string(),
        });
        handle
    }
}

pub trait AssetImporter: Send + Sync {
    fn asset_type(&self) -> AssetType;

    fn try_load(
        &self,
        metadata: &AssetMetadata,
        ctx: &ImportContext<'_>,
        sub_assets: &mut dyn SubAssetSink,
    ) -> Result<Asset, ImportError>;
}

/// Asset type → importer.
#[derive(Clone, Default)]
pub struct ImporterSet {
    importers: HashMap<AssetType, Arc<dyn AssetImporter>>,
}

impl ImporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture, model and scene importers.
    pub fn with_defaults(model: &ModelImportConfig) -> Self {
        let mut set = Self::new();
        set.register(Arc::new(TextureImporter));
        set.register(Arc::new(ModelImporter::with_default_decoders(*model)));
        set.register(Arc::new(SceneImporter));
        set
    }

    /// Register `importer` for its type, replacing any previous one.
    pub fn register(&mut self, importer: Arc<dyn AssetImporter>) -> Option<Arc<dyn AssetImporter>> {
        self.importers.insert(importer.asset_type(), importer)
    }

    pub fn get(&self, asset_type: AssetType) -> Option<&Arc<dyn AssetImporter>> {
        self.importers.get(&asset_type)
    }

    pub fn resolve(&self, asset_type: AssetType) -> Result<Arc<dyn AssetImporter>, ImportError> {
        match self.importers.get(&asset_type) {
            Some(importer) => Ok(Arc::clone(importer)),
            None => {
                tracing::warn!("No importer registered for asset type {}", asset_type);
                Err(ImportError::NoImporter(asset_type))
            }
        }
    }

    /// Dispatch by `metadata.asset_type`.
    pub fn import(
        &self,
        metadata: &AssetMetadata,
        ctx: &ImportContext<'_>,
        sub_assets: &mut dyn SubAssetSink,
    ) -> Result<Asset, ImportError> {
        self.resolve(metadata.asset_type)?
            .try_load(metadata, ctx, sub_assets)
    }

    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }
}

impl std::fmt::Debug for ImporterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.importers.keys()).finish()
    }
}
