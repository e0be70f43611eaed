//! Background asset loading
//!
//! [`AsyncAssetLoader`] owns the registry behind a mutex and decodes on a
//! rayon pool. Decoding runs without the lock; only planning and committing
//! take it. Each handle is decoded at most once at a time.

use crate::asset::AssetRef;
use crate::error::AssetError;
use crate::registry::{AssetRegistry, LoadJob, LoadPlan};
use crate::AssetHandle;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct Shared {
    registry: Mutex<AssetRegistry>,
    /// Signalled after every committed load, successful or not.
    completed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, AssetRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct AsyncAssetLoader {
    shared: Arc<Shared>,
    pool: rayon::ThreadPool,
}

impl AsyncAssetLoader {
    /// `worker_threads == 0` lets rayon pick one thread per core.
    pub fn new(registry: AssetRegistry, worker_threads: usize) -> Result<Self, AssetError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|index| format!("asset-loader-{index}"))
            .build()?;
        tracing::info!("Asset loader started with {} workers", pool.current_num_threads());

        Ok(Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(registry),
                completed: Condvar::new(),
            }),
            pool,
        })
    }

    /// Exclusive access to the registry for imports, removal and queries.
    pub fn registry(&self) -> MutexGuard<'_, AssetRegistry> {
        self.shared.lock()
    }

    /// Return the asset if it is ready, otherwise queue its load (or its
    /// parent's) and return `None`.
    pub fn request(&self, handle: AssetHandle) -> Option<AssetRef> {
        let mut registry = self.shared.lock();
        self.request_locked(&mut registry, handle)
    }

    fn request_locked(&self, registry: &mut AssetRegistry, handle: AssetHandle) -> Option<AssetRef> {
        match registry.plan_load(handle) {
            LoadPlan::Ready(asset) => Some(asset),
            LoadPlan::Parent(parent) => {
                self.request_locked(registry, parent);
                None
            }
            LoadPlan::Dispatch(job) => {
                self.spawn(job);
                None
            }
            LoadPlan::InFlight | LoadPlan::Unavailable => None,
        }
    }

    fn spawn(&self, job: LoadJob) {
        let shared = Arc::clone(&self.shared);
        tracing::debug!("Queued load of {}", job.handle());
        self.pool.spawn(move || {
            let result = job.run();
            {
                let mut registry = shared.lock();
                // Failures are logged by the registry; waiters observe them as
                // a handle that is neither cached nor in flight.
                let _ = registry.commit_load(result);
            }
            shared.completed.notify_all();
        });
    }

    /// Whether `handle`, or the parent that produces it, is being decoded.
    pub fn is_pending(&self, handle: AssetHandle) -> bool {
        is_pending_in(&self.shared.lock(), handle)
    }

    pub fn pending_count(&self) -> usize {
        self.shared.lock().in_flight_count()
    }

    /// Request `handle` and block until it is ready, its load fails, or
    /// `timeout` passes.
    pub fn wait_for(&self, handle: AssetHandle, timeout: Duration) -> Option<AssetRef> {
        let deadline = Instant::now() + timeout;
        let mut registry = self.shared.lock();
        if let Some(asset) = self.request_locked(&mut registry, handle) {
            return Some(asset);
        }

        loop {
            if let Some(asset) = registry.cached(handle) {
                return Some(asset);
            }
            if !is_pending_in(&registry, handle) {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("Timed out waiting for asset {}", handle);
                return None;
            }
            registry = self
                .shared
                .completed
                .wait_timeout(registry, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Block until nothing is in flight. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut registry = self.shared.lock();
        while registry.in_flight_count() > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            registry = self
                .shared
                .completed
                .wait_timeout(registry, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

fn is_pending_in(registry: &AssetRegistry, handle: AssetHandle) -> bool {
    let mut current = handle;
    loop {
        if registry.cached(current).is_some() {
            return false;
        }
        if registry.is_in_flight(current) {
            return true;
        }
        match registry.parent_of(current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetPipelineConfig;
    use crate::importer::decode::DecodedScene;
    use crate::importer::{ImporterSet, ModelImporter};
    use crate::test_support::{rgb_png, two_mesh_scene, FixedSceneDecoder};
    use crate::AssetType;
    use latch_core::fs::MemoryFileSystem;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn setup(scene: DecodedScene) -> (Arc<MemoryFileSystem>, Arc<FixedSceneDecoder>, AssetRegistry) {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("assets/model.fbx", b"fbx".to_vec());
        fs.insert("assets/a.png", rgb_png(4, 4));
        let decoder = Arc::new(FixedSceneDecoder::new(scene));
        let registry = build_registry(fs.clone(), decoder.clone());
        (fs, decoder, registry)
    }

    fn build_registry(fs: Arc<MemoryFileSystem>, decoder: Arc<FixedSceneDecoder>) -> AssetRegistry {
        let config = AssetPipelineConfig::default();
        let mut importers = ImporterSet::with_defaults(&config.model);
        importers.register(Arc::new(
            ModelImporter::with_default_decoders(config.model).with_decoder("fbx", decoder),
        ));
        AssetRegistry::with_importers(&config, fs, importers)
    }

    #[test]
    fn test_concurrent_requests_decode_once() {
        let (_fs, decoder, registry) = setup(two_mesh_scene());
        let loader = AsyncAssetLoader::new(registry, 2).unwrap();
        let handle = loader.registry().import_asset("model.fbx").unwrap();

        for _ in 0..8 {
            loader.request(handle);
        }
        let asset = loader.wait_for(handle, TIMEOUT).unwrap();
        assert_eq!(asset.asset_type(), AssetType::Model);
        assert_eq!(decoder.calls(), 1);
        assert!(!loader.is_pending(handle));
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn test_sub_asset_request_loads_parent() {
        let (fs, decoder, mut registry) = setup(two_mesh_scene());
        let handle = registry.import_asset("model.fbx").unwrap();
        registry.get_asset(handle).unwrap();
        let mesh = *registry.sub_assets(handle).iter().next().unwrap();

        // Fresh registry: the mesh is only known from the sidecar.
        let loader = AsyncAssetLoader::new(build_registry(fs, decoder.clone()), 1).unwrap();
        loader.registry().import_asset("model.fbx").unwrap();
        assert!(loader.request(mesh).is_none());

        let asset = loader.wait_for(mesh, TIMEOUT).unwrap();
        assert_eq!(asset.handle(), mesh);
        assert!(loader.registry().is_loaded(handle));
        assert_eq!(decoder.calls(), 2);
    }

    #[test]
    fn test_failed_load_wakes_waiters() {
        let mut scene = two_mesh_scene();
        scene.incomplete = true;
        let (_fs, _decoder, registry) = setup(scene);
        let loader = AsyncAssetLoader::new(registry, 1).unwrap();
        let handle = loader.registry().import_asset("model.fbx").unwrap();

        let started = Instant::now();
        assert!(loader.wait_for(handle, TIMEOUT).is_none());
        assert!(started.elapsed() < TIMEOUT);
        assert!(!loader.is_pending(handle));
        assert!(loader.registry().sub_assets(handle).is_empty());
    }

    #[test]
    fn test_unknown_handle() {
        let (_fs, _decoder, registry) = setup(two_mesh_scene());
        let loader = AsyncAssetLoader::new(registry, 1).unwrap();
        let unknown = AssetHandle::from_raw(99);
        assert!(loader.request(unknown).is_none());
        assert!(!loader.is_pending(unknown));
        assert!(loader.wait_for(unknown, TIMEOUT).is_none());
    }

    #[test]
    fn test_wait_idle() {
        let (_fs, _decoder, registry) = setup(two_mesh_scene());
        let loader = AsyncAssetLoader::new(registry, 2).unwrap();
        let (model, texture) = {
            let mut registry = loader.registry();
            (
                registry.import_asset("model.fbx").unwrap(),
                registry.import_asset("a.png").unwrap(),
            )
        };
        loader.request(model);
        loader.request(texture);
        assert!(loader.wait_idle(TIMEOUT));
        assert!(loader.request(model).is_some());
        assert!(loader.request(texture).is_some());
    }
}
