//! Latch Engine Editor
//!
//! Headless asset pipeline front end: scans a project's asset folder,
//! registers every source file and optionally decodes them all.
//!
//! Usage:
//!   latch-editor [PROJECT_DIR] [--load]

use anyhow::{Context, Result};
use latch_asset::{AssetPipelineConfig, AssetRegistry, AsyncAssetLoader};
use latch_core::fs::{DiskFileSystem, FileSystem};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod scan;

const LOAD_TIMEOUT: Duration = Duration::from_secs(300);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Latch Editor v{}", latch_core::VERSION);

    let mut project = PathBuf::from(".");
    let mut load = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--load" => load = true,
            _ => project = PathBuf::from(arg),
        }
    }

    let fs: Arc<dyn FileSystem> = Arc::new(DiskFileSystem);
    let config_path = project.join(AssetPipelineConfig::FILE_NAME);
    let mut config = AssetPipelineConfig::load_or_default(&*fs, &config_path)
        .with_context(|| format!("load {}", config_path.display()))?;
    if config.asset_root.is_relative() {
        config.asset_root = project.join(&config.asset_root);
    }
    if !fs.exists(&config.asset_root) {
        anyhow::bail!("asset root {} does not exist", config.asset_root.display());
    }

    let mut registry = AssetRegistry::new(&config, Arc::clone(&fs));
    let report = scan::import_directory(&mut registry)
        .with_context(|| format!("scan {}", config.asset_root.display()))?;
    tracing::info!(
        "Scanned {}: {} imported, {} skipped, {} failed",
        config.asset_root.display(),
        report.imported.len(),
        report.skipped.len(),
        report.failed.len()
    );

    if load {
        let loader = AsyncAssetLoader::new(registry, config.worker_threads)?;
        for &handle in &report.imported {
            loader.request(handle);
        }
        if !loader.wait_idle(LOAD_TIMEOUT) {
            tracing::warn!("{} loads still pending", loader.pending_count());
        }

        let registry = loader.registry();
        let loaded = report
            .imported
            .iter()
            .filter(|&&handle| registry.is_loaded(handle))
            .count();
        tracing::info!(
            "Loaded {}/{} assets ({} registered with sub-assets)",
            loaded,
            report.imported.len(),
            registry.len()
        );
    }

    Ok(())
}
