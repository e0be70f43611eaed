//! Model importer
//!
//! Decodes a scene file and splits it into one Mesh sub-asset per source
//! mesh plus a Model holding the node hierarchy. Mesh handles are derived
//! from the model handle and the mesh index, so re-importing an unchanged
//! file reproduces them.

use super::decode::{
    post_process, DecodedMesh, DecodedNode, DecodedScene, GltfDecoder, ObjDecoder, SceneDecoder,
    SceneSource,
};
use super::{AssetImporter, ImportContext, SubAssetSink};
use crate::asset::{Asset, MeshAsset, ModelAsset, ModelNode, SubMesh, Vertex};
use crate::config::ModelImportConfig;
use crate::error::ImportError;
use crate::metadata::AssetMetadata;
use crate::{AssetHandle, AssetType};
use latch_core::math::{Mat3, Mat4, Vec3};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Sub-asset kind used when deriving mesh handles.
pub const MESH_SUB_ASSET: &str = "Mesh";

pub struct ModelImporter {
    decoders: HashMap<String, Arc<dyn SceneDecoder>>,
    options: ModelImportConfig,
}

impl ModelImporter {
    /// An importer without any scene decoder.
    pub fn new(options: ModelImportConfig) -> Self {
        Self {
            decoders: HashMap::new(),
            options,
        }
    }

    /// glTF/GLB and OBJ decoders.
    pub fn with_default_decoders(options: ModelImportConfig) -> Self {
        Self::new(options)
            .with_decoder("gltf", Arc::new(GltfDecoder))
            .with_decoder("glb", Arc::new(GltfDecoder))
            .with_decoder("obj", Arc::new(ObjDecoder))
    }

    pub fn with_decoder(mut self, extension: &str, decoder: Arc<dyn SceneDecoder>) -> Self {
        self.register_decoder(extension, decoder);
        self
    }

    /// Register `decoder` for files ending in `extension` (no dot).
    pub fn register_decoder(&mut self, extension: &str, decoder: Arc<dyn SceneDecoder>) {
        self.decoders.insert(
            extension.trim_start_matches('.').to_ascii_lowercase(),
            decoder,
        );
    }

    fn decoder_for(&self, path: &Path) -> Result<&Arc<dyn SceneDecoder>, ImportError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        self.decoders
            .get(&extension)
            .ok_or_else(|| ImportError::NoSceneDecoder {
                path: path.to_path_buf(),
                extension,
            })
    }
}

fn build_mesh(decoded: DecodedMesh, handle: AssetHandle) -> MeshAsset {
    let vertices = (0..decoded.positions.len())
        .map(|i| {
            let mut vertex = Vertex {
                position: decoded.positions[i].to_array(),
                ..Default::default()
            };
            if let Some(normals) = &decoded.normals {
                vertex.normal = normals[i].to_array();
            }
            if let Some(tangents) = &decoded.tangents {
                vertex.tangent = tangents[i].to_array();
            }
            if let Some(uvs) = &decoded.uvs {
                vertex.uv = uvs[i].to_array();
            }
            if let Some(colors) = &decoded.colors {
                vertex.color = colors[i].to_array();
            }
            vertex
        })
        .collect();

    let index_count = decoded.indices.len() as u32;
    MeshAsset {
        handle,
        vertices,
        indices: decoded.indices,
        submeshes: vec![SubMesh {
            name: decoded.name,
            index_offset: 0,
            index_count,
        }],
    }
}

fn mesh_name(decoded: &DecodedMesh, index: usize) -> String {
    if decoded.name.is_empty() {
        format!("Mesh{index}")
    } else {
        decoded.name.clone()
    }
}

/// Append `node` and its subtree in pre-order, returning its index.
fn push_node(
    node: &DecodedNode,
    parent: Option<u32>,
    mesh_slots: &[Option<u32>],
    out: &mut Vec<ModelNode>,
) -> u32 {
    let index = out.len() as u32;
    out.push(ModelNode {
        name: node.name.clone(),
        local_transform: node.transform,
        parent,
        children: Vec::new(),
        mesh: node
            .meshes
            .first()
            .and_then(|&mesh| mesh_slots.get(mesh).copied().flatten()),
    });
    for child in &node.children {
        let child_index = push_node(child, Some(index), mesh_slots, out);
        out[index as usize].children.push(child_index);
    }
    index
}

/// World transform of the first node (pre-order) referencing each mesh.
fn first_world_transforms(node: &DecodedNode, parent: Mat4, out: &mut [Option<Mat4>]) {
    let world = parent * node.transform;
    for &mesh in &node.meshes {
        if let Some(slot) = out.get_mut(mesh) {
            slot.get_or_insert(world);
        }
    }
    for child in &node.children {
        first_world_transforms(child, world, out);
    }
}

fn bake(mesh: &mut MeshAsset, world: Mat4) {
    if world == Mat4::IDENTITY {
        return;
    }
    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    for vertex in &mut mesh.vertices {
        vertex.position = world.transform_point3(Vec3::from(vertex.position)).to_array();
        vertex.normal = (normal_matrix * Vec3::from(vertex.normal))
            .normalize_or_zero()
            .to_array();
        vertex.tangent = world
            .transform_vector3(Vec3::from(vertex.tangent))
            .normalize_or_zero()
            .to_array();
    }
    if world.determinant() < 0.0 {
        for tri in mesh.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }
}

impl ModelImporter {
    fn import_hierarchy(
        &self,
        scene: DecodedScene,
        root: DecodedNode,
        metadata: &AssetMetadata,
        sub_assets: &mut dyn SubAssetSink,
    ) -> ModelAsset {
        let mut mesh_slots = vec![None; scene.meshes.len()];
        let mut meshes = Vec::new();

        for (index, decoded) in scene.meshes.into_iter().enumerate() {
            let name = mesh_name(&decoded, index);
            let handle = AssetHandle::derive(metadata.handle, MESH_SUB_ASSET, index as u32);
            let mesh = build_mesh(decoded, handle);
            if !mesh.is_valid() {
                tracing::warn!(
                    "Skipping empty mesh '{}' in {}",
                    name,
                    metadata.path.display()
                );
                continue;
            }
            sub_assets.add_sub_asset(metadata.handle, Asset::Mesh(mesh), &name);
            mesh_slots[index] = Some(meshes.len() as u32);
            meshes.push(handle);
        }

        let mut hierarchy = Vec::with_capacity(root.count());
        push_node(&root, None, &mesh_slots, &mut hierarchy);

        ModelAsset {
            handle: metadata.handle,
            meshes,
            hierarchy,
        }
    }

    fn import_flattened(
        &self,
        scene: DecodedScene,
        root: DecodedNode,
        metadata: &AssetMetadata,
        sub_assets: &mut dyn SubAssetSink,
    ) -> ModelAsset {
        let mut worlds = vec![None; scene.meshes.len()];
        first_world_transforms(&root, Mat4::IDENTITY, &mut worlds);

        let handle = AssetHandle::derive(metadata.handle, MESH_SUB_ASSET, 0);
        let mut combined = MeshAsset {
            handle,
            ..Default::default()
        };
        for (index, decoded) in scene.meshes.into_iter().enumerate() {
            let name = mesh_name(&decoded, index);
            let mut mesh = build_mesh(decoded, handle);
            bake(&mut mesh, worlds[index].unwrap_or(Mat4::IDENTITY));

            let base_vertex = combined.vertices.len() as u32;
            combined.submeshes.push(SubMesh {
                name,
                index_offset: combined.indices.len() as u32,
                index_count: mesh.indices.len() as u32,
            });
            combined
                .indices
                .extend(mesh.indices.iter().map(|&i| i + base_vertex));
            combined.vertices.extend(mesh.vertices);
        }

        let mut meshes = Vec::new();
        if combined.is_valid() {
            sub_assets.add_sub_asset(metadata.handle, Asset::Mesh(combined), &root.name);
            meshes.push(handle);
        } else {
            tracing::warn!(
                "Flattened model {} has no geometry",
                metadata.path.display()
            );
        }

        ModelAsset {
            handle: metadata.handle,
            hierarchy: vec![ModelNode {
                name: root.name,
                local_transform: Mat4::IDENTITY,
                parent: None,
                children: Vec::new(),
                mesh: (!meshes.is_empty()).then_some(0),
            }],
            meshes,
        }
    }
}

impl AssetImporter for ModelImporter {
    fn asset_type(&self) -> AssetType {
        AssetType::Model
    }

    fn try_load(
        &self,
        metadata: &AssetMetadata,
        ctx: &ImportContext<'_>,
        sub_assets: &mut dyn SubAssetSink,
    ) -> Result<Asset, ImportError> {
        let path = ctx.source_path(metadata);
        let settings = metadata
            .import_settings
            .model()
            .copied()
            .ok_or_else(|| ImportError::SettingsMismatch {
                path: path.clone(),
                asset_type: AssetType::Model,
            })?;

        let decoder = self.decoder_for(&path)?;
        let bytes = ctx.read_source(metadata)?;
        let mut scene = decoder.decode(&SceneSource {
            path: &path,
            bytes: &bytes,
            fs: ctx.fs,
        })?;

        if scene.incomplete {
            return Err(ImportError::IncompleteScene { path });
        }
        post_process(&mut scene, &self.options, &path)?;
        let Some(mut root) = scene.root.take() else {
            return Err(ImportError::MissingRootNode { path });
        };
        if let Some(stem) = metadata.path.file_stem().and_then(|stem| stem.to_str()) {
            root.name = stem.to_string();
        }

        let model = if settings.flatten_hierarchy {
            self.import_flattened(scene, root, metadata, sub_assets)
        } else {
            self.import_hierarchy(scene, root, metadata, sub_assets)
        };
        if !model.is_valid() {
            return Err(ImportError::EmptyHierarchy { path });
        }

        tracing::debug!(
            "Imported model {} ({} meshes, {} nodes)",
            metadata.path.display(),
            model.meshes.len(),
            model.hierarchy.len()
        );
        Ok(Asset::Model(model))
    }
}
