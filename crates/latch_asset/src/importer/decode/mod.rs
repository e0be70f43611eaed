//! Scene decoding
//!
//! A [`SceneDecoder`] turns source bytes into a [`DecodedScene`]; the model
//! importer then runs [`post_process`] over it before building assets.

pub mod gltf;
pub mod obj;

use crate::config::ModelImportConfig;
use crate::error::ImportError;
use latch_core::fs::FileSystem;
use latch_core::math::{self, Mat4, Vec2, Vec3};
use std::collections::HashMap;
use std::path::Path;

pub use self::gltf::GltfDecoder;
pub use self::obj::ObjDecoder;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    pub colors: Option<Vec<Vec3>>,
    pub indices: Vec<u32>,
    /// Index count of each face, empty when every face is a triangle.
    pub face_sizes: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNode {
    pub name: String,
    pub transform: Mat4,
    /// Indices into [`DecodedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<DecodedNode>,
}

impl DecodedNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(DecodedNode::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedScene {
    pub meshes: Vec<DecodedMesh>,
    pub root: Option<DecodedNode>,
    /// Set when the decoder could not produce usable geometry.
    pub incomplete: bool,
}

/// Source handed to a decoder.
pub struct SceneSource<'a> {
    /// File system path of the source file.
    pub path: &'a Path,
    pub bytes: &'a [u8],
    /// For formats that reference companion files.
    pub fs: &'a dyn FileSystem,
}

pub trait SceneDecoder: Send + Sync {
    fn decode(&self, source: &SceneSource<'_>) -> Result<DecodedScene, ImportError>;
}

/// Validate and normalize a decoded scene in place.
///
/// Faces must be triangles. Attribute streams whose length does not match
/// the positions are dropped, then identical vertices are welded, missing
/// normals and tangents generated, the scene converted to left-handed and
/// the unit scale applied to the root.
pub fn post_process(
    scene: &mut DecodedScene,
    options: &ModelImportConfig,
    path: &Path,
) -> Result<(), ImportError> {
    for (index, mesh) in scene.meshes.iter_mut().enumerate() {
        validate_faces(mesh, index, path)?;
        drop_mismatched_streams(mesh, path);
        if options.join_identical_vertices {
            join_identical_vertices(mesh);
        }
        if options.generate_normals && mesh.normals.is_none() {
            generate_normals(mesh);
        }
        if options.generate_tangents && mesh.tangents.is_none() {
            generate_tangents(mesh);
        }
        if options.left_handed {
            mirror_mesh(mesh);
        }
    }

    if let Some(root) = scene.root.as_mut() {
        if options.left_handed {
            mirror_node(root);
        }
        if options.unit_scale != 1.0 {
            root.transform = Mat4::from_scale(Vec3::splat(options.unit_scale)) * root.transform;
        }
    }
    Ok(())
}

fn validate_faces(mesh: &DecodedMesh, index: usize, path: &Path) -> Result<(), ImportError> {
    if mesh.face_sizes.is_empty() {
        if mesh.indices.len() % 3 != 0 {
            return Err(ImportError::NonTriangularFace {
                path: path.to_path_buf(),
                mesh: index,
                face: mesh.indices.len() / 3,
                indices: (mesh.indices.len() % 3) as u32,
            });
        }
    } else {
        if let Some(face) = mesh.face_sizes.iter().position(|&size| size != 3) {
            return Err(ImportError::NonTriangularFace {
                path: path.to_path_buf(),
                mesh: index,
                face,
                indices: mesh.face_sizes[face],
            });
        }
        if mesh.face_sizes.len() * 3 != mesh.indices.len() {
            return Err(ImportError::SceneDecode {
                path: path.to_path_buf(),
                reason: format!(
                    "mesh {index} declares {} faces but has {} indices",
                    mesh.face_sizes.len(),
                    mesh.indices.len()
                ),
            });
        }
    }

    let vertex_count = mesh.positions.len();
    if let Some(&bad) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(ImportError::IndexOutOfRange {
            path: path.to_path_buf(),
            mesh: index,
            index: bad,
            vertex_count,
        });
    }
    Ok(())
}

fn drop_mismatched_streams(mesh: &mut DecodedMesh, path: &Path) {
    let count = mesh.positions.len();
    let name = mesh.name.clone();
    let check = |label: &str, len: Option<usize>| -> bool {
        match len {
            Some(len) if len != count => {
                tracing::warn!(
                    "{}: mesh '{}' has {} {} for {} vertices, ignoring them",
                    path.display(),
                    name,
                    len,
                    label,
                    count
                );
                false
            }
            _ => true,
        }
    };
    if !check("normals", mesh.normals.as_ref().map(Vec::len)) {
        mesh.normals = None;
    }
    if !check("tangents", mesh.tangents.as_ref().map(Vec::len)) {
        mesh.tangents = None;
    }
    if !check("uvs", mesh.uvs.as_ref().map(Vec::len)) {
        mesh.uvs = None;
    }
    if !check("colors", mesh.colors.as_ref().map(Vec::len)) {
        mesh.colors = None;
    }
}

fn push_bits(key: &mut Vec<u32>, values: &[f32]) {
    key.extend(values.iter().map(|v| v.to_bits()));
}

fn join_identical_vertices(mesh: &mut DecodedMesh) {
    let count = mesh.positions.len();
    let mut seen: HashMap<Vec<u32>, u32> = HashMap::with_capacity(count);
    let mut remap = Vec::with_capacity(count);
    let mut kept = Vec::new();

    for i in 0..count {
        let mut key = Vec::with_capacity(14);
        push_bits(&mut key, &mesh.positions[i].to_array());
        if let Some(normals) = &mesh.normals {
            push_bits(&mut key, &normals[i].to_array());
        }
        if let Some(tangents) = &mesh.tangents {
            push_bits(&mut key, &tangents[i].to_array());
        }
        if let Some(uvs) = &mesh.uvs {
            push_bits(&mut key, &uvs[i].to_array());
        }
        if let Some(colors) = &mesh.colors {
            push_bits(&mut key, &colors[i].to_array());
        }

        let next = kept.len() as u32;
        let slot = *seen.entry(key).or_insert_with(|| {
            kept.push(i);
            next
        });
        remap.push(slot);
    }

    if kept.len() == count {
        return;
    }

    fn gather<T: Copy>(values: &[T], kept: &[usize]) -> Vec<T> {
        kept.iter().map(|&i| values[i]).collect()
    }
    mesh.positions = gather(&mesh.positions, &kept);
    mesh.normals = mesh.normals.as_deref().map(|v| gather(v, &kept));
    mesh.tangents = mesh.tangents.as_deref().map(|v| gather(v, &kept));
    mesh.uvs = mesh.uvs.as_deref().map(|v| gather(v, &kept));
    mesh.colors = mesh.colors.as_deref().map(|v| gather(v, &kept));
    for index in &mut mesh.indices {
        *index = remap[*index as usize];
    }
}

/// Smooth, area-weighted vertex normals.
fn generate_normals(mesh: &mut DecodedMesh) {
    let mut normals = vec![Vec3::ZERO; mesh.positions.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let p0 = mesh.positions[a];
        let face = (mesh.positions[b] - p0).cross(mesh.positions[c] - p0);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    for normal in &mut normals {
        *normal = normal.normalize_or_zero();
    }
    mesh.normals = Some(normals);
}

/// Per-vertex tangents from UV gradients. Without UVs there is nothing to
/// derive them from and vertices keep zero tangents.
fn generate_tangents(mesh: &mut DecodedMesh) {
    let Some(uvs) = &mesh.uvs else {
        return;
    };
    let mut tangents = vec![Vec3::ZERO; mesh.positions.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let e1 = mesh.positions[b] - mesh.positions[a];
        let e2 = mesh.positions[c] - mesh.positions[a];
        let d1 = uvs[b] - uvs[a];
        let d2 = uvs[c] - uvs[a];
        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let tangent = (e1 * d2.y - e2 * d1.y) / det;
        tangents[a] += tangent;
        tangents[b] += tangent;
        tangents[c] += tangent;
    }

    let normals = mesh.normals.as_deref();
    for (i, tangent) in tangents.iter_mut().enumerate() {
        if let Some(n) = normals.map(|n| n[i]) {
            *tangent -= n * n.dot(*tangent);
        }
        *tangent = tangent.normalize_or_zero();
    }
    mesh.tangents = Some(tangents);
}

fn mirror_vec(v: &mut Vec3) {
    v.z = -v.z;
}

fn mirror_mesh(mesh: &mut DecodedMesh) {
    mesh.positions.iter_mut().for_each(mirror_vec);
    if let Some(normals) = &mut mesh.normals {
        normals.iter_mut().for_each(mirror_vec);
    }
    if let Some(tangents) = &mut mesh.tangents {
        tangents.iter_mut().for_each(mirror_vec);
    }
    for tri in mesh.indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}

fn mirror_node(node: &mut DecodedNode) {
    node.transform = math::mirror_z(node.transform);
    node.children.iter_mut().for_each(mirror_node);
}
