//! Asset type tags

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of asset a handle refers to.
///
/// `None` is the invalid marker and never names a registered asset.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AssetType {
    #[default]
    None,
    Texture,
    Model,
    Mesh,
    Material,
    Scene,
}

impl AssetType {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssetType::None => "None",
            AssetType::Texture => "Texture",
            AssetType::Model => "Model",
            AssetType::Mesh => "Mesh",
            AssetType::Material => "Material",
            AssetType::Scene => "Scene",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown asset type '{0}'")]
pub struct UnknownAssetType(pub String);

impl FromStr for AssetType {
    type Err = UnknownAssetType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(AssetType::None),
            "Texture" => Ok(AssetType::Texture),
            "Model" => Ok(AssetType::Model),
            "Mesh" => Ok(AssetType::Mesh),
            "Material" => Ok(AssetType::Material),
            "Scene" => Ok(AssetType::Scene),
            other => Err(UnknownAssetType(other.to_string())),
        }
    }
}
