//! Asset pipeline errors

use crate::{AssetHandle, AssetType};
use latch_core::fs::FsError;
use std::path::PathBuf;
use thiserror::Error;

/// Reading or writing a sidecar metadata file failed.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("failed to parse metadata {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode metadata for asset {handle}: {source}")]
    Encode {
        handle: AssetHandle,
        #[source]
        source: serde_json::Error,
    },

    #[error("metadata {} declares an unknown asset type '{type_name}'", .path.display())]
    InvalidType { path: PathBuf, type_name: String },

    #[error("metadata {} declares an invalid handle", .path.display())]
    InvalidHandle { path: PathBuf },

    #[error("invalid {asset_type} import settings in {}: {source}", .path.display())]
    Settings {
        path: PathBuf,
        asset_type: AssetType,
        #[source]
        source: serde_json::Error,
    },
}

/// An importer could not turn a source file into an asset.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no importer registered for asset type {0}")]
    NoImporter(AssetType),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("failed to read image header of {}: {source}", .path.display())]
    ImageHeader {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unrecognized image container in {}", .path.display())]
    UnknownImageFormat { path: PathBuf },

    #[error("failed to decode image {}: {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{} has {channels} channels; only 3 and 4 channel images are supported", .path.display())]
    UnsupportedChannels { path: PathBuf, channels: u8 },

    #[error("no scene decoder for '.{extension}' files ({})", .path.display())]
    NoSceneDecoder { path: PathBuf, extension: String },

    #[error("failed to decode scene {}: {reason}", .path.display())]
    SceneDecode { path: PathBuf, reason: String },

    #[error("scene {} is incomplete", .path.display())]
    IncompleteScene { path: PathBuf },

    #[error("scene {} has no root node", .path.display())]
    MissingRootNode { path: PathBuf },

    #[error("mesh {mesh} of {} has a face with {indices} indices at face {face}", .path.display())]
    NonTriangularFace {
        path: PathBuf,
        mesh: usize,
        face: usize,
        indices: u32,
    },

    #[error("mesh {mesh} of {} references vertex {index} of {vertex_count}", .path.display())]
    IndexOutOfRange {
        path: PathBuf,
        mesh: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("model {} produced an empty node hierarchy", .path.display())]
    EmptyHierarchy { path: PathBuf },

    #[error("import settings for {} do not match asset type {asset_type}", .path.display())]
    SettingsMismatch { path: PathBuf, asset_type: AssetType },
}

/// Errors surfaced by the asset registry facade.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no asset type is registered for the extension of {}", .path.display())]
    UnsupportedExtension { path: PathBuf },

    #[error("invalid asset handle {0}")]
    InvalidHandle(AssetHandle),

    #[error("asset {0} is memory-only and has no source file")]
    NotFileBacked(AssetHandle),

    #[error("asset graph violation: {0}")]
    StructuralViolation(String),

    #[error("asset {0} could not be loaded")]
    LoadFailed(AssetHandle),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("failed to build asset worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode config: {0}")]
    Encode(#[source] serde_json::Error),
}
