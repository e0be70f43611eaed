//! Decoded asset payloads

use crate::metadata::{AnisotropyLevel, TextureFilter, TextureWrap};
use crate::{AssetHandle, AssetType};
use bytemuck::{Pod, Zeroable};
use latch_core::math::Mat4;
use std::sync::Arc;

/// Shared, immutable decoded asset.
pub type AssetRef = Arc<Asset>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit unsigned normalized RGBA
    Rgba8,
    /// 32-bit float RGBA
    Rgba32F,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgba32F => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureAsset {
    pub handle: AssetHandle,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    pub generate_mips: bool,
    pub anisotropy: AnisotropyLevel,
}

impl TextureAsset {
    pub fn expected_len(&self) -> usize {
        self.format.bytes_per_pixel() * self.width as usize * self.height as usize
    }
}

/// Interleaved mesh vertex (56 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0; 3],
            tangent: [0.0; 3],
            uv: [0.0; 2],
            color: [1.0; 3],
        }
    }
}

/// Named index range inside a [`MeshAsset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubMesh {
    pub name: String,
    pub index_offset: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshAsset {
    pub handle: AssetHandle,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubMesh>,
}

impl MeshAsset {
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty() && self.indices.len() % 3 == 0
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub local_transform: Mat4,
    /// Index of the parent node, `None` for the root.
    pub parent: Option<u32>,
    pub children: Vec<u32>,
    /// Index into [`ModelAsset::meshes`].
    pub mesh: Option<u32>,
}

impl ModelNode {
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelAsset {
    pub handle: AssetHandle,
    pub meshes: Vec<AssetHandle>,
    /// Nodes in pre-order; node 0 is the root.
    pub hierarchy: Vec<ModelNode>,
}

impl ModelAsset {
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.hierarchy.is_empty()
    }
}

/// Scene reference. The scene itself is loaded by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneAsset {
    pub handle: AssetHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Texture(TextureAsset),
    Mesh(MeshAsset),
    Model(ModelAsset),
    Scene(SceneAsset),
}

impl Asset {
    pub fn handle(&self) -> AssetHandle {
        match self {
            Asset::Texture(texture) => texture.handle,
            Asset::Mesh(mesh) => mesh.handle,
            Asset::Model(model) => model.handle,
            Asset::Scene(scene) => scene.handle,
        }
    }

    /// Rebind the payload to `handle`.
    pub fn set_handle(&mut self, handle: AssetHandle) {
        match self {
            Asset::Texture(texture) => texture.handle = handle,
            Asset::Mesh(mesh) => mesh.handle = handle,
            Asset::Model(model) => model.handle = handle,
            Asset::Scene(scene) => scene.handle = handle,
        }
    }

    pub fn asset_type(&self) -> AssetType {
        match self {
            Asset::Texture(_) => AssetType::Texture,
            Asset::Mesh(_) => AssetType::Mesh,
            Asset::Model(_) => AssetType::Model,
            Asset::Scene(_) => AssetType::Scene,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureAsset> {
        match self {
            Asset::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshAsset> {
        match self {
            Asset::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&ModelAsset> {
        match self {
            Asset::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_scene(&self) -> Option<&SceneAsset> {
        match self {
            Asset::Scene(scene) => Some(scene),
            _ => None,
        }
    }
}
