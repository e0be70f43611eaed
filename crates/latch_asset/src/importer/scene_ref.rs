//! Scene reference importer

use super::{AssetImporter, ImportContext, SubAssetSink};
use crate::asset::{Asset, SceneAsset};
use crate::error::ImportError;
use crate::metadata::AssetMetadata;
use crate::AssetType;

/// Produces an opaque reference; scene contents are loaded by the runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct SceneImporter;

impl AssetImporter for SceneImporter {
    fn asset_type(&self) -> AssetType {
        AssetType::Scene
    }

    fn try_load(
        &self,
        metadata: &AssetMetadata,
        _ctx: &ImportContext<'_>,
        _sub_assets: &mut dyn SubAssetSink,
    ) -> Result<Asset, ImportError> {
        Ok(Asset::Scene(SceneAsset {
            handle: metadata.handle,
        }))
    }
}
