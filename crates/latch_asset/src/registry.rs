//! Asset registry
//!
//! The editor-facing facade over the metadata store, the importers and the
//! decoded asset caches. A handle moves through
//! `Registered → Cached`, drops back to `Registered` on reload, and is
//! forgotten on removal.
//!
//! Loading is split into [`AssetRegistry::plan_load`], [`LoadJob::run`] and
//! [`AssetRegistry::commit_load`] so the decode step can run without holding
//! the registry. [`AssetRegistry::get_asset`] runs all three in place.

use crate::asset::{Asset, AssetRef};
use crate::config::AssetPipelineConfig;
use crate::error::{AssetError, ImportError};
use crate::extensions::asset_type_from_path;
use crate::importer::{ImportContext, ImporterSet, SubAssetBatch};
use crate::metadata::AssetMetadata;
use crate::sidecar::{self, SubAssetRecord};
use crate::store::MetadataStore;
use crate::{AssetHandle, AssetType};
use latch_core::fs::FileSystem;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// What has to happen before an asset can be handed out.
pub enum LoadPlan {
    /// Already decoded.
    Ready(AssetRef),
    /// A sub-asset; its parent must be loaded first.
    Parent(AssetHandle),
    /// Being decoded elsewhere.
    InFlight,
    /// Decode with this job, then commit the result.
    Dispatch(LoadJob),
    /// Unknown handle or nothing to load.
    Unavailable,
}

/// A pending import, detached from the registry.
pub struct LoadJob {
    metadata: AssetMetadata,
    importers: Arc<ImporterSet>,
    fs: Arc<dyn FileSystem>,
    asset_root: PathBuf,
}

impl LoadJob {
    pub fn handle(&self) -> AssetHandle {
        self.metadata.handle
    }

    pub fn run(self) -> LoadResult {
        let ctx = ImportContext::new(&*self.fs, &self.asset_root);
        let mut batch = SubAssetBatch::new();
        let outcome = self
            .importers
            .import(&self.metadata, &ctx, &mut batch)
            .map(|asset| (asset, batch));
        LoadResult {
            handle: self.metadata.handle,
            path: self.metadata.path,
            outcome,
        }
    }
}

/// Output of [`LoadJob::run`].
pub struct LoadResult {
    pub handle: AssetHandle,
    pub path: PathBuf,
    pub outcome: Result<(Asset, SubAssetBatch), ImportError>,
}

pub struct AssetRegistry {
    fs: Arc<dyn FileSystem>,
    asset_root: PathBuf,
    meta_extension: String,
    importers: Arc<ImporterSet>,
    store: MetadataStore,
    loaded: HashMap<AssetHandle, AssetRef>,
    memory_only: HashMap<AssetHandle, AssetRef>,
    in_flight: HashSet<AssetHandle>,
}

/// Resolve `.` and `..` without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl AssetRegistry {
    /// Registry with the default importers.
    pub fn new(config: &AssetPipelineConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self::with_importers(config, fs, ImporterSet::with_defaults(&config.model))
    }

    pub fn with_importers(
        config: &AssetPipelineConfig,
        fs: Arc<dyn FileSystem>,
        importers: ImporterSet,
    ) -> Self {
        Self {
            fs,
            asset_root: normalize(&config.asset_root),
            meta_extension: config.meta_extension.clone(),
            importers: Arc::new(importers),
            store: MetadataStore::new(),
            loaded: HashMap::new(),
            memory_only: HashMap::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn importers_mut(&mut self) -> &mut ImporterSet {
        Arc::make_mut(&mut self.importers)
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn meta_extension(&self) -> &str {
        &self.meta_extension
    }

    // ---------------------------------------------------------------
    // Paths
    // ---------------------------------------------------------------

    /// `path` relative to the asset root. Paths outside the root are only
    /// normalized.
    pub fn relative_path(&self, path: &Path) -> PathBuf {
        let normalized = normalize(path);
        match normalized.strip_prefix(&self.asset_root) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => normalized,
        }
    }

    /// File system location of a root-relative path.
    pub fn file_system_path(&self, relative: &Path) -> PathBuf {
        self.asset_root.join(relative)
    }

    /// Sidecar location for a root-relative source path.
    pub fn meta_file_path(&self, relative: &Path) -> PathBuf {
        let mut path = self.file_system_path(relative).into_os_string();
        path.push(".");
        path.push(&self.meta_extension);
        PathBuf::from(path)
    }

    // ---------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------

    /// Register the source file at `path`, returning its handle.
    ///
    /// Importing a path that is already registered returns the existing
    /// handle without touching the sidecar. Otherwise the sidecar is read if
    /// present (sub-asset summaries included), or created from the
    /// extension table.
    pub fn import_asset(&mut self, path: impl AsRef<Path>) -> Result<AssetHandle, AssetError> {
        let relative = self.relative_path(path.as_ref());
        let existing = self.store.get_by_path(&relative);
        if existing.is_valid() {
            return Ok(existing.handle);
        }

        let meta_path = self.meta_file_path(&relative);
        if self.fs.exists(&meta_path) {
            return self.import_from_sidecar(relative, &meta_path);
        }

        let asset_type = asset_type_from_path(&relative);
        if asset_type == AssetType::None {
            tracing::warn!("Unsupported asset extension: {}", relative.display());
            return Err(AssetError::UnsupportedExtension { path: relative });
        }

        let metadata = AssetMetadata::new(AssetHandle::generate(), asset_type, relative);
        let handle = metadata.handle;
        sidecar::write(&*self.fs, &meta_path, &metadata, &[])?;
        tracing::info!(
            "Imported {} as {} {}",
            metadata.path.display(),
            asset_type,
            handle
        );
        self.store.insert(metadata)?;
        Ok(handle)
    }

    fn import_from_sidecar(
        &mut self,
        relative: PathBuf,
        meta_path: &Path,
    ) -> Result<AssetHandle, AssetError> {
        let meta = sidecar::read(&*self.fs, meta_path)?;
        let mut metadata = meta.metadata;
        let handle = metadata.handle;
        if self.store.contains(handle) {
            return Err(AssetError::StructuralViolation(format!(
                "{} declares handle {} which is already registered for {}",
                meta_path.display(),
                handle,
                self.store.get(handle).path.display()
            )));
        }
        metadata.path = relative;
        self.store.insert(metadata)?;

        if let Err(err) = self.register_summaries(handle, &meta.sub_assets) {
            self.forget(handle);
            return Err(err);
        }
        tracing::debug!(
            "Registered {} from {} ({} sub-assets)",
            handle,
            meta_path.display(),
            meta.sub_assets.len()
        );
        Ok(handle)
    }

    fn register_summaries(
        &mut self,
        parent: AssetHandle,
        summaries: &[SubAssetRecord],
    ) -> Result<(), AssetError> {
        for summary in summaries {
            if summary.asset_type == AssetType::None {
                return Err(AssetError::StructuralViolation(format!(
                    "sub-asset {} ('{}') of {} has no asset type",
                    summary.handle, summary.name, parent
                )));
            }
            if self.store.contains(summary.handle) {
                return Err(AssetError::StructuralViolation(format!(
                    "sub-asset {} of {} is already registered",
                    summary.handle, parent
                )));
            }
            self.store.insert(AssetMetadata::memory_only(
                summary.handle,
                summary.asset_type,
                Some(&summary.name),
            ))?;
            self.store.register_sub_asset(parent, summary.handle)?;
        }
        Ok(())
    }

    /// Cache `asset` without any source file. A valid handle carried by the
    /// asset is kept, otherwise one is generated.
    pub fn add_memory_only_asset(
        &mut self,
        mut asset: Asset,
        name: Option<&str>,
    ) -> Result<AssetHandle, AssetError> {
        let handle = if asset.handle().is_valid() {
            asset.handle()
        } else {
            let handle = AssetHandle::generate();
            asset.set_handle(handle);
            handle
        };
        if let Some(record) = self.store.record(handle) {
            if !record.metadata.is_memory_only {
                return Err(AssetError::StructuralViolation(format!(
                    "asset {handle} is file-backed and cannot be replaced by a memory-only asset"
                )));
            }
        }

        self.store
            .insert(AssetMetadata::memory_only(handle, asset.asset_type(), name))?;
        self.memory_only.insert(handle, Arc::new(asset));
        Ok(handle)
    }

    /// Cache `asset` as a memory-only sub-asset of `parent`.
    pub fn add_sub_asset(
        &mut self,
        parent: AssetHandle,
        asset: Asset,
        name: Option<&str>,
    ) -> Result<AssetHandle, AssetError> {
        if !self.store.contains(parent) {
            return Err(AssetError::InvalidHandle(parent));
        }
        let requested = asset.handle();
        let existed = requested.is_valid() && self.store.contains(requested);
        if requested == parent {
            return Err(AssetError::StructuralViolation(format!(
                "asset {requested} cannot be its own sub-asset"
            )));
        }
        if existed && self.store.is_ancestor(requested, parent) {
            return Err(AssetError::StructuralViolation(format!(
                "parenting {requested} under {parent} would create a cycle"
            )));
        }

        let handle = self.add_memory_only_asset(asset, name)?;
        if let Err(err) = self.store.register_sub_asset(parent, handle) {
            // Only undo a record this call created.
            if !existed {
                self.forget(handle);
            }
            return Err(err);
        }
        Ok(handle)
    }

    // ---------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------

    /// Decoded asset for `handle`, importing it on first use.
    ///
    /// Sub-assets are produced by loading their parent. Failures are logged
    /// and yield `None`.
    pub fn get_asset(&mut self, handle: AssetHandle) -> Option<AssetRef> {
        match self.plan_load(handle) {
            LoadPlan::Ready(asset) => Some(asset),
            LoadPlan::Parent(parent) => {
                self.get_asset(parent)?;
                let asset = self.cached(handle);
                if asset.is_none() {
                    tracing::error!(
                        "Loading {} did not produce its sub-asset {}",
                        parent,
                        handle
                    );
                }
                asset
            }
            LoadPlan::Dispatch(job) => self.commit_load(job.run()).ok(),
            LoadPlan::InFlight | LoadPlan::Unavailable => None,
        }
    }

    /// Already decoded asset, without importing.
    pub fn cached(&self, handle: AssetHandle) -> Option<AssetRef> {
        self.memory_only
            .get(&handle)
            .or_else(|| self.loaded.get(&handle))
            .cloned()
    }

    /// Decide how `handle` gets loaded. A returned [`LoadPlan::Dispatch`]
    /// marks the handle in flight until [`commit_load`](Self::commit_load).
    pub fn plan_load(&mut self, handle: AssetHandle) -> LoadPlan {
        if let Some(asset) = self.cached(handle) {
            return LoadPlan::Ready(asset);
        }

        let metadata = self.store.get(handle);
        if !metadata.is_valid() {
            return LoadPlan::Unavailable;
        }
        if let Some(parent) = self.store.parent(handle) {
            return LoadPlan::Parent(parent);
        }
        if metadata.is_memory_only {
            tracing::error!(
                "Memory-only asset {} ({}) has neither a payload nor a parent",
                handle,
                metadata.path.display()
            );
            return LoadPlan::Unavailable;
        }
        if !self.in_flight.insert(handle) {
            return LoadPlan::InFlight;
        }

        LoadPlan::Dispatch(LoadJob {
            metadata: metadata.clone(),
            importers: Arc::clone(&self.importers),
            fs: Arc::clone(&self.fs),
            asset_root: self.asset_root.clone(),
        })
    }

    pub fn is_in_flight(&self, handle: AssetHandle) -> bool {
        self.in_flight.contains(&handle)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Install the result of a load: replace the sub-asset graph, cache the
    /// asset and persist the sidecar. Any failure leaves the handle
    /// registered but not cached, with no sub-assets.
    pub fn commit_load(&mut self, result: LoadResult) -> Result<AssetRef, AssetError> {
        let handle = result.handle;
        self.in_flight.remove(&handle);

        if !self.store.get(handle).is_valid() {
            tracing::debug!("Discarding load of {} removed while loading", handle);
            return Err(AssetError::InvalidHandle(handle));
        }

        let (asset, batch) = match result.outcome {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::error!("Failed to import {}: {}", result.path.display(), err);
                return Err(err.into());
            }
        };

        self.clear_descendants(handle);
        for pending in batch.into_vec() {
            if let Err(err) = self.add_sub_asset(pending.parent, pending.asset, Some(&pending.name))
            {
                tracing::error!(
                    "Failed to register sub-asset '{}' of {}: {}",
                    pending.name,
                    result.path.display(),
                    err
                );
                self.clear_descendants(handle);
                return Err(err);
            }
        }

        let asset = Arc::new(asset);
        self.loaded.insert(handle, Arc::clone(&asset));
        if let Err(err) = self.write_metadata(handle) {
            tracing::error!(
                "Failed to write metadata for {}: {}",
                result.path.display(),
                err
            );
            self.loaded.remove(&handle);
            self.clear_descendants(handle);
            return Err(err);
        }

        tracing::info!(
            "Loaded {} {} ({} sub-assets)",
            asset.asset_type(),
            result.path.display(),
            self.store.children(handle).len()
        );
        Ok(asset)
    }

    /// Drop the cached payload and sub-assets of `handle` and import it
    /// again.
    pub fn reload_asset(&mut self, handle: AssetHandle) -> Result<AssetRef, AssetError> {
        let metadata = self.store.get(handle);
        if !metadata.is_valid() {
            return Err(AssetError::InvalidHandle(handle));
        }
        if metadata.is_memory_only {
            return Err(AssetError::NotFileBacked(handle));
        }

        self.clear_descendants(handle);
        self.loaded.remove(&handle);
        match self.plan_load(handle) {
            LoadPlan::Dispatch(job) => self.commit_load(job.run()),
            LoadPlan::InFlight => Err(AssetError::StructuralViolation(format!(
                "asset {handle} is already being loaded"
            ))),
            LoadPlan::Ready(_) | LoadPlan::Parent(_) | LoadPlan::Unavailable => {
                Err(AssetError::LoadFailed(handle))
            }
        }
    }

    // ---------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------

    /// Forget `handle` and all of its sub-assets. Sidecar files are left on
    /// disk.
    pub fn remove_asset(&mut self, handle: AssetHandle) -> bool {
        if !self.store.contains(handle) {
            return false;
        }
        self.forget(handle);
        true
    }

    fn forget(&mut self, handle: AssetHandle) {
        for removed in self.store.remove_subtree(handle) {
            self.evict(removed);
        }
    }

    fn clear_descendants(&mut self, handle: AssetHandle) {
        for removed in self.store.remove_descendants(handle) {
            self.evict(removed);
        }
    }

    fn evict(&mut self, handle: AssetHandle) {
        self.loaded.remove(&handle);
        self.memory_only.remove(&handle);
        self.in_flight.remove(&handle);
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Metadata for `handle`, or the invalid sentinel.
    pub fn metadata(&self, handle: AssetHandle) -> &AssetMetadata {
        self.store.get(handle)
    }

    /// Metadata for the source at `path`, or the invalid sentinel.
    pub fn metadata_by_path(&self, path: impl AsRef<Path>) -> &AssetMetadata {
        let relative = self.relative_path(path.as_ref());
        self.store.get_by_path(&relative)
    }

    pub fn sub_assets(&self, handle: AssetHandle) -> BTreeSet<AssetHandle> {
        self.store.children(handle)
    }

    pub fn parent_of(&self, handle: AssetHandle) -> Option<AssetHandle> {
        self.store.parent(handle)
    }

    pub fn is_loaded(&self, handle: AssetHandle) -> bool {
        self.loaded.contains_key(&handle) || self.memory_only.contains_key(&handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = AssetHandle> + '_ {
        self.store.handles()
    }

    /// Number of registered assets, sub-assets included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Persist the metadata of a file-backed asset together with the
    /// summaries of its direct sub-assets.
    pub fn write_metadata(&self, handle: AssetHandle) -> Result<(), AssetError> {
        let metadata = self.store.get(handle);
        if !metadata.is_valid() {
            return Err(AssetError::InvalidHandle(handle));
        }
        if metadata.is_memory_only {
            return Err(AssetError::NotFileBacked(handle));
        }

        let summaries: Vec<SubAssetRecord> = self
            .store
            .children(handle)
            .into_iter()
            .map(|child| {
                let child_metadata = self.store.get(child);
                SubAssetRecord {
                    handle: child,
                    asset_type: child_metadata.asset_type,
                    name: child_metadata.path.to_string_lossy().into_owned(),
                }
            })
            .collect();
        sidecar::write(
            &*self.fs,
            &self.meta_file_path(&metadata.path),
            metadata,
            &summaries,
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("asset_root", &self.asset_root)
            .field("assets", &self.store.len())
            .field("loaded", &self.loaded.len())
            .field("memory_only", &self.memory_only.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{MeshAsset, PixelFormat, SceneAsset};
    use crate::config::ModelImportConfig;
    use crate::importer::decode::DecodedNode;
    use crate::importer::ModelImporter;
    use crate::test_support::{rgb_png, triangle, two_mesh_scene, FixedSceneDecoder};
    use latch_core::fs::{FsError, MemoryFileSystem};
    use latch_core::math::Vec3;

    struct Fixture {
        fs: Arc<MemoryFileSystem>,
        decoder: Arc<FixedSceneDecoder>,
        registry: AssetRegistry,
    }

    fn registry_with(fs: Arc<MemoryFileSystem>, decoder: Arc<FixedSceneDecoder>) -> AssetRegistry {
        let config = AssetPipelineConfig::default();
        let mut importers = ImporterSet::with_defaults(&config.model);
        importers.register(Arc::new(
            ModelImporter::with_default_decoders(config.model)
                .with_decoder("fbx", decoder.clone()),
        ));
        AssetRegistry::with_importers(&config, fs, importers)
    }

    fn fixture_with(scene: crate::importer::decode::DecodedScene) -> Fixture {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("assets/model.fbx", b"fbx".to_vec());
        fs.insert("assets/textures/rgb.png", rgb_png(8, 4));
        fs.insert("assets/main.epoch", b"{}".to_vec());
        let decoder = Arc::new(FixedSceneDecoder::new(scene));
        let registry = registry_with(fs.clone(), decoder.clone());
        Fixture {
            fs,
            decoder,
            registry,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(two_mesh_scene())
    }

    fn three_mesh_scene() -> crate::importer::decode::DecodedScene {
        let mut scene = two_mesh_scene();
        scene.meshes.push(triangle("Cone", Vec3::new(0.0, 3.0, 0.0)));
        let mut node = DecodedNode::new("Top");
        node.meshes.push(2);
        scene.root.as_mut().unwrap().children.push(node);
        scene
    }

    fn read_sidecar(fs: &MemoryFileSystem, path: &str) -> sidecar::MetaFile {
        sidecar::read(fs, Path::new(path)).unwrap()
    }

    #[test]
    fn test_import_is_idempotent() {
        let mut fx = fixture();
        let first = fx.registry.import_asset("model.fbx").unwrap();
        assert!(fx.fs.exists(Path::new("assets/model.fbx.meta")));

        // A rewrite would recreate the sidecar.
        fx.fs.remove(Path::new("assets/model.fbx.meta"));
        let second = fx.registry.import_asset("assets/./model.fbx").unwrap();
        assert_eq!(first, second);
        assert!(!fx.fs.exists(Path::new("assets/model.fbx.meta")));
        assert_eq!(fx.registry.len(), 1);
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let mut fx = fixture();
        fx.fs.insert("assets/readme.txt", b"hi".to_vec());
        let err = fx.registry.import_asset("readme.txt").unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedExtension { .. }));
        assert!(fx.registry.is_empty());
        assert!(!fx.fs.exists(Path::new("assets/readme.txt.meta")));
    }

    #[test]
    fn test_paths() {
        let fx = fixture();
        let registry = &fx.registry;
        assert_eq!(
            registry.relative_path(Path::new("assets/models/../a.png")),
            PathBuf::from("a.png")
        );
        assert_eq!(
            registry.relative_path(Path::new("textures/b.png")),
            PathBuf::from("textures/b.png")
        );
        assert_eq!(
            registry.file_system_path(Path::new("textures/b.png")),
            PathBuf::from("assets/textures/b.png")
        );
        assert_eq!(
            registry.meta_file_path(Path::new("textures/b.png")),
            PathBuf::from("assets/textures/b.png.meta")
        );
    }

    #[test]
    fn test_fresh_model_import() {
        let mut fx = fixture();
        let model_handle = fx.registry.import_asset("model.fbx").unwrap();
        let asset = fx.registry.get_asset(model_handle).unwrap();
        let model = asset.as_model().unwrap();

        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.hierarchy.len(), 3);
        assert_eq!(model.hierarchy[0].parent, None);
        assert_eq!(model.hierarchy[1].mesh, Some(0));
        assert_eq!(model.hierarchy[2].mesh, Some(1));
        for (index, handle) in model.meshes.iter().enumerate() {
            assert_eq!(*handle, AssetHandle::derive(model_handle, "Mesh", index as u32));
            assert_eq!(fx.registry.parent_of(*handle), Some(model_handle));
            assert_eq!(fx.registry.metadata(*handle).asset_type, AssetType::Mesh);
            assert!(fx.registry.metadata(*handle).is_memory_only);
        }

        let meta = read_sidecar(&fx.fs, "assets/model.fbx.meta");
        assert_eq!(meta.metadata.handle, model_handle);
        let listed: BTreeSet<AssetHandle> = meta.sub_assets.iter().map(|s| s.handle).collect();
        assert_eq!(listed, fx.registry.sub_assets(model_handle));
        assert_eq!(listed.len(), 2);
        let mut names: Vec<&str> = meta.sub_assets.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Cube", "Sphere"]);
    }

    #[test]
    fn test_sub_asset_handles_are_deterministic() {
        let mut fx = fixture_with(three_mesh_scene());
        let handle = fx.registry.import_asset("model.fbx").unwrap();
        let first = fx.registry.get_asset(handle).unwrap();

        // A fresh registry over the same files picks the sidecar up.
        let mut second_registry = registry_with(fx.fs.clone(), fx.decoder.clone());
        assert_eq!(second_registry.import_asset("model.fbx").unwrap(), handle);
        let second = second_registry.get_asset(handle).unwrap();

        let expected: Vec<AssetHandle> = (0..3)
            .map(|index| AssetHandle::derive(handle, "Mesh", index))
            .collect();
        assert_eq!(first.as_model().unwrap().meshes, expected);
        assert_eq!(second.as_model().unwrap().meshes, expected);
    }

    #[test]
    fn test_sidecar_registers_sub_assets_and_loads_them_through_parent() {
        let mut fx = fixture();
        let handle = fx.registry.import_asset("model.fbx").unwrap();
        fx.registry.get_asset(handle).unwrap();
        let meshes = fx.registry.sub_assets(handle);

        let mut registry = registry_with(fx.fs.clone(), fx.decoder.clone());
        registry.import_asset("model.fbx").unwrap();
        assert_eq!(registry.sub_assets(handle), meshes);
        assert_eq!(registry.len(), 3);

        let calls = fx.decoder.calls();
        let first_mesh = *meshes.iter().next().unwrap();
        let mesh = registry.get_asset(first_mesh).unwrap();
        assert_eq!(mesh.asset_type(), AssetType::Mesh);
        assert_eq!(mesh.handle(), first_mesh);
        assert!(registry.is_loaded(handle));
        assert_eq!(fx.decoder.calls(), calls + 1);
    }

    #[test]
    fn test_remove_cascades() {
        let mut fx = fixture();
        let handle = fx.registry.import_asset("model.fbx").unwrap();
        fx.registry.get_asset(handle).unwrap();
        let meshes = fx.registry.sub_assets(handle);
        assert_eq!(meshes.len(), 2);

        assert!(fx.registry.remove_asset(handle));
        assert!(fx.registry.is_empty());
        assert!(!fx.registry.metadata(handle).is_valid());
        assert!(!fx.registry.metadata_by_path("model.fbx").is_valid());
        for mesh in meshes {
            assert!(!fx.registry.metadata(mesh).is_valid());
            assert!(!fx.registry.is_loaded(mesh));
            assert!(fx.registry.get_asset(mesh).is_none());
            assert_eq!(fx.registry.parent_of(mesh), None);
        }
        assert!(!fx.registry.remove_asset(handle));
    }

    #[test]
    fn test_removing_sub_asset_detaches_it() {
        let mut fx = fixture();
        let handle = fx.registry.import_asset("model.fbx").unwrap();
        fx.registry.get_asset(handle).unwrap();
        let mesh = *fx.registry.sub_assets(handle).iter().next().unwrap();

        assert!(fx.registry.remove_asset(mesh));
        assert_eq!(fx.registry.sub_assets(handle).len(), 1);
        assert!(!fx.registry.sub_assets(handle).contains(&mesh));
        assert!(fx.registry.is_loaded(handle));
    }

    #[test]
    fn test_reload_regenerates_sub_assets() {
        let mut fx = fixture();
        let handle = fx.registry.import_asset("model.fbx").unwrap();
        let before = fx.registry.get_asset(handle).unwrap();
        let reloaded = fx.registry.reload_asset(handle).unwrap();

        assert_eq!(fx.decoder.calls(), 2);
        assert!(!Arc::ptr_eq(&before, &reloaded));
        assert_eq!(
            before.as_model().unwrap().meshes,
            reloaded.as_model().unwrap().meshes
        );
        assert_eq!(fx.registry.sub_assets(handle).len(), 2);
        assert_eq!(fx.registry.len(), 3);
    }

    #[test]
    fn test_reload_rejects_unknown_and_memory_only() {
        let mut fx = fixture();
        assert!(matches!(
            fx.registry.reload_asset(AssetHandle::from_raw(77)),
            Err(AssetError::InvalidHandle(_))
        ));
        let scene = fx
            .registry
            .add_memory_only_asset(
                Asset::Scene(SceneAsset {
                    handle: AssetHandle::INVALID,
                }),
                Some("runtime"),
            )
            .unwrap();
        assert!(matches!(
            fx.registry.reload_asset(scene),
            Err(AssetError::NotFileBacked(_))
        ));
    }

    #[test]
    fn test_failed_import_leaves_no_sub_assets() {
        let mut scene = two_mesh_scene();
        scene.incomplete = true;
        let mut fx = fixture_with(scene);
        let handle = fx.registry.import_asset("model.fbx").unwrap();

        assert!(fx.registry.get_asset(handle).is_none());
        assert!(fx.registry.sub_assets(handle).is_empty());
        assert!(!fx.registry.is_loaded(handle));
        assert!(!fx.registry.is_in_flight(handle));
        assert_eq!(fx.registry.len(), 1);
        // Still registered, so a later load is attempted again.
        assert!(fx.registry.metadata(handle).is_valid());
    }

    #[test]
    fn test_texture_import_promotes_rgb() {
        let mut fx = fixture();
        let handle = fx.registry.import_asset("textures/rgb.png").unwrap();
        let asset = fx.registry.get_asset(handle).unwrap();
        let texture = asset.as_texture().unwrap();
        assert_eq!(texture.format, PixelFormat::Rgba8);
        assert_eq!(texture.data.len(), 4 * 8 * 4);
        assert!(fx.registry.sub_assets(handle).is_empty());

        let meta = read_sidecar(&fx.fs, "assets/textures/rgb.png.meta");
        assert_eq!(meta.metadata.asset_type, AssetType::Texture);
        assert!(meta.sub_assets.is_empty());
    }

    #[test]
    fn test_scene_reference_import() {
        let mut fx = fixture();
        let handle = fx.registry.import_asset("main.epoch").unwrap();
        let asset = fx.registry.get_asset(handle).unwrap();
        assert_eq!(asset.as_scene().unwrap().handle, handle);
    }

    #[test]
    fn test_memory_only_and_sub_assets() {
        let mut fx = fixture();
        let parent = fx
            .registry
            .add_memory_only_asset(
                Asset::Scene(SceneAsset {
                    handle: AssetHandle::INVALID,
                }),
                Some("generated"),
            )
            .unwrap();
        assert!(fx.registry.is_loaded(parent));
        assert_eq!(
            fx.registry.metadata(parent).path,
            PathBuf::from("generated")
        );

        let child = fx
            .registry
            .add_sub_asset(parent, Asset::Mesh(MeshAsset::default()), Some("quad"))
            .unwrap();
        assert_eq!(fx.registry.parent_of(child), Some(parent));
        assert!(fx.registry.get_asset(child).is_some());

        let orphan = fx.registry.add_sub_asset(
            AssetHandle::from_raw(12345),
            Asset::Mesh(MeshAsset::default()),
            None,
        );
        assert!(matches!(orphan, Err(AssetError::InvalidHandle(_))));

        assert!(fx.registry.remove_asset(parent));
        assert!(fx.registry.is_empty());
    }

    #[test]
    fn test_rejected_reparenting_keeps_existing_records() {
        let mut fx = fixture();
        let parent = fx
            .registry
            .add_memory_only_asset(
                Asset::Scene(SceneAsset {
                    handle: AssetHandle::INVALID,
                }),
                Some("generated"),
            )
            .unwrap();
        let child = fx
            .registry
            .add_sub_asset(parent, Asset::Mesh(MeshAsset::default()), Some("quad"))
            .unwrap();

        let onto_itself = fx.registry.add_sub_asset(
            parent,
            Asset::Scene(SceneAsset { handle: parent }),
            None,
        );
        assert!(matches!(onto_itself, Err(AssetError::StructuralViolation(_))));

        let under_child = fx.registry.add_sub_asset(
            child,
            Asset::Scene(SceneAsset { handle: parent }),
            None,
        );
        assert!(matches!(under_child, Err(AssetError::StructuralViolation(_))));

        assert_eq!(fx.registry.len(), 2);
        assert!(fx.registry.metadata(parent).is_valid());
        assert!(fx.registry.metadata(child).is_valid());
        assert!(fx.registry.is_loaded(parent));
        assert_eq!(fx.registry.parent_of(child), Some(parent));
        assert_eq!(fx.registry.parent_of(parent), None);
    }

    #[test]
    fn test_untyped_sub_asset_in_sidecar_is_rejected() {
        let mut fx = fixture();
        let handle = AssetHandle::from_raw(4242);
        let meta = AssetMetadata::new(handle, AssetType::Model, "");
        let untyped = SubAssetRecord {
            handle: AssetHandle::from_raw(5),
            asset_type: AssetType::None,
            name: "Cube".to_owned(),
        };
        fx.fs.insert(
            "assets/model.fbx.meta",
            sidecar::to_string(&meta, &[untyped]).unwrap(),
        );

        let err = fx.registry.import_asset("model.fbx").unwrap_err();
        match err {
            AssetError::StructuralViolation(message) => assert!(message.contains("no asset type")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(fx.registry.is_empty());
        assert!(!fx.registry.metadata(handle).is_valid());
    }

    #[test]
    fn test_handles_lists_sub_assets() {
        let mut fx = fixture();
        let model = fx.registry.import_asset("model.fbx").unwrap();
        fx.registry.get_asset(model).unwrap();

        let handles: BTreeSet<AssetHandle> = fx.registry.handles().collect();
        let mut expected = fx.registry.sub_assets(model);
        expected.insert(model);
        assert_eq!(handles, expected);
        assert_eq!(handles.len(), 3);
    }

    #[test]
    fn test_importers_can_be_swapped_after_construction() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("assets/model.fbx", b"fbx".to_vec());
        let config = AssetPipelineConfig::default();
        let mut registry = AssetRegistry::new(&config, fs.clone());
        let decoder = Arc::new(FixedSceneDecoder::new(two_mesh_scene()));
        let previous = registry.importers_mut().register(Arc::new(
            ModelImporter::with_default_decoders(config.model).with_decoder("fbx", decoder.clone()),
        ));
        assert!(previous.is_some());

        let handle = registry.import_asset("model.fbx").unwrap();
        let asset = registry.get_asset(handle).unwrap();
        assert_eq!(asset.as_model().unwrap().meshes.len(), 2);
        assert_eq!(decoder.calls(), 1);
    }

    #[test]
    fn test_invalid_handles_yield_nothing() {
        let mut fx = fixture();
        assert!(fx.registry.get_asset(AssetHandle::INVALID).is_none());
        assert!(fx.registry.get_asset(AssetHandle::from_raw(5)).is_none());
        assert_eq!(fx.registry.metadata(AssetHandle::from_raw(5)).asset_type, AssetType::None);
    }

    #[test]
    fn test_moved_source_keeps_sidecar_handle() {
        let mut fx = fixture();
        let handle = fx.registry.import_asset("model.fbx").unwrap();
        let sidecar_text = fx.fs.read(Path::new("assets/model.fbx.meta")).unwrap();
        fx.fs.insert("assets/moved/model.fbx", b"fbx".to_vec());
        fx.fs.insert("assets/moved/model.fbx.meta", sidecar_text);

        let mut registry = registry_with(fx.fs.clone(), fx.decoder.clone());
        assert_eq!(registry.import_asset("moved/model.fbx").unwrap(), handle);
        assert_eq!(
            registry.metadata(handle).path,
            PathBuf::from("moved/model.fbx")
        );
    }

    struct ReadOnlyFileSystem(MemoryFileSystem);

    impl FileSystem for ReadOnlyFileSystem {
        fn exists(&self, path: &Path) -> bool {
            self.0.exists(path)
        }

        fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
            self.0.read(path)
        }

        fn write(&self, path: &Path, _contents: &[u8]) -> Result<(), FsError> {
            Err(FsError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn walk(&self, root: &Path) -> Result<Vec<PathBuf>, FsError> {
            self.0.walk(root)
        }
    }

    #[test]
    fn test_sidecar_write_failure_fails_import() {
        let memory = MemoryFileSystem::new();
        memory.insert("assets/a.png", rgb_png(2, 2));
        let fs = Arc::new(ReadOnlyFileSystem(memory));
        let mut registry = AssetRegistry::new(&AssetPipelineConfig::default(), fs);

        let err = registry.import_asset("a.png").unwrap_err();
        assert!(matches!(err, AssetError::Metadata(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sidecar_write_failure_rolls_back_load() {
        let memory = MemoryFileSystem::new();
        memory.insert("assets/model.fbx", b"fbx".to_vec());
        let handle = AssetHandle::from_raw(4242);
        let meta = AssetMetadata::new(handle, AssetType::Model, "");
        memory.insert(
            "assets/model.fbx.meta",
            sidecar::to_string(&meta, &[]).unwrap(),
        );

        let config = AssetPipelineConfig::default();
        let mut importers = ImporterSet::with_defaults(&config.model);
        importers.register(Arc::new(
            ModelImporter::with_default_decoders(ModelImportConfig::default()).with_decoder(
                "fbx",
                Arc::new(FixedSceneDecoder::new(two_mesh_scene())),
            ),
        ));
        let mut registry =
            AssetRegistry::with_importers(&config, Arc::new(ReadOnlyFileSystem(memory)), importers);

        assert_eq!(registry.import_asset("model.fbx").unwrap(), handle);
        assert!(registry.get_asset(handle).is_none());
        assert!(!registry.is_loaded(handle));
        assert!(registry.sub_assets(handle).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_disk_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AssetPipelineConfig {
            asset_root: dir.path().to_path_buf(),
            ..Default::default()
        };
        let source = dir.path().join("tex.png");
        std::fs::write(&source, rgb_png(3, 3)).unwrap();

        let fs: Arc<dyn FileSystem> = Arc::new(latch_core::fs::DiskFileSystem);
        let mut registry = AssetRegistry::new(&config, fs);
        let handle = registry.import_asset(&source).unwrap();
        assert_eq!(registry.metadata(handle).path, PathBuf::from("tex.png"));
        assert!(dir.path().join("tex.png.meta").exists());
        assert!(registry.get_asset(handle).is_some());
    }
}
