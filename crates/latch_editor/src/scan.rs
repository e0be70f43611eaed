//! Project scan: register every importable file below the asset root.

use latch_asset::{asset_type_from_path, AssetError, AssetHandle, AssetRegistry, AssetType};
use latch_core::fs::FsError;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct ScanReport {
    pub imported: Vec<AssetHandle>,
    /// Files with no known asset type.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, AssetError)>,
}

/// Import every file under the registry's asset root. Sidecars are not
/// counted.
pub fn import_directory(registry: &mut AssetRegistry) -> Result<ScanReport, FsError> {
    let files = registry.file_system().walk(registry.asset_root())?;
    let meta_extension = registry.meta_extension().to_owned();
    let mut report = ScanReport::default();

    for path in files {
        let extension = path.extension().and_then(|ext| ext.to_str());
        if extension == Some(meta_extension.as_str()) {
            continue;
        }
        if asset_type_from_path(&path) == AssetType::None {
            tracing::debug!("Skipping {}", path.display());
            report.skipped.push(path);
            continue;
        }

        match registry.import_asset(&path) {
            Ok(handle) => report.imported.push(handle),
            Err(err) => {
                tracing::error!("Failed to import {}: {}", path.display(), err);
                report.failed.push((path, err));
            }
        }
    }

    Ok(report)
}
