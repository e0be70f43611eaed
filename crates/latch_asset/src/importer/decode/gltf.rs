//! glTF 2.0 decoder (`.gltf` with external buffers, and `.glb`)

use super::{DecodedMesh, DecodedNode, DecodedScene, SceneDecoder, SceneSource};
use crate::error::ImportError;
use gltf::buffer::Source;
use gltf::mesh::Mode;
use latch_core::math::{Mat4, Vec2, Vec3};
use std::path::PathBuf;

#[derive(Debug, Default, Clone, Copy)]
pub struct GltfDecoder;

fn decode_error(source: &SceneSource<'_>, reason: impl Into<String>) -> ImportError {
    ImportError::SceneDecode {
        path: source.path.to_path_buf(),
        reason: reason.into(),
    }
}

fn load_buffers(gltf: &gltf::Gltf, source: &SceneSource<'_>) -> Result<Vec<Vec<u8>>, ImportError> {
    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            Source::Bin => gltf
                .blob
                .clone()
                .ok_or_else(|| decode_error(source, "binary chunk referenced but missing"))?,
            Source::Uri(uri) if uri.starts_with("data:") => {
                return Err(decode_error(source, "embedded data URIs are not supported"));
            }
            Source::Uri(uri) => {
                let resolved = source
                    .path
                    .parent()
                    .map(|dir| dir.join(uri))
                    .unwrap_or_else(|| PathBuf::from(uri));
                source.fs.read(&resolved)?
            }
        };
        if data.len() < buffer.length() {
            return Err(decode_error(
                source,
                format!(
                    "buffer {} holds {} bytes, {} declared",
                    buffer.index(),
                    data.len(),
                    buffer.length()
                ),
            ));
        }
        buffers.push(data);
    }
    Ok(buffers)
}

/// Triangle list indices for `mode`, `None` for point and line primitives.
fn triangulate(mode: Mode, indices: Vec<u32>) -> Option<Vec<u32>> {
    match mode {
        Mode::Triangles => Some(indices),
        Mode::TriangleStrip => Some(
            indices
                .windows(3)
                .enumerate()
                .flat_map(|(i, w)| {
                    if i % 2 == 0 {
                        [w[0], w[1], w[2]]
                    } else {
                        [w[1], w[0], w[2]]
                    }
                })
                .collect(),
        ),
        Mode::TriangleFan => Some(
            indices
                .iter()
                .skip(1)
                .zip(indices.iter().skip(2))
                .flat_map(|(&b, &c)| [indices[0], b, c])
                .collect(),
        ),
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip => None,
    }
}

fn convert_node(node: gltf::Node<'_>, mesh_map: &[Vec<usize>]) -> DecodedNode {
    DecodedNode {
        name: node
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Node{}", node.index())),
        transform: Mat4::from_cols_array_2d(&node.transform().matrix()),
        meshes: node
            .mesh()
            .and_then(|mesh| mesh_map.get(mesh.index()).cloned())
            .unwrap_or_default(),
        children: node
            .children()
            .map(|child| convert_node(child, mesh_map))
            .collect(),
    }
}

impl SceneDecoder for GltfDecoder {
    fn decode(&self, source: &SceneSource<'_>) -> Result<DecodedScene, ImportError> {
        let gltf = gltf::Gltf::from_slice(source.bytes)
            .map_err(|e| decode_error(source, e.to_string()))?;
        let buffers = load_buffers(&gltf, source)?;

        // glTF mesh index → decoded mesh indices, one per kept primitive.
        let mut mesh_map = Vec::new();
        let mut meshes = Vec::new();
        for mesh in gltf.meshes() {
            let base_name = mesh
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Mesh{}", mesh.index()));
            let split = mesh.primitives().len() > 1;
            let mut slots = Vec::new();

            for primitive in mesh.primitives() {
                let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
                let Some(positions) = reader.read_positions() else {
                    tracing::warn!(
                        "{}: primitive {} of '{}' has no positions",
                        source.path.display(),
                        primitive.index(),
                        base_name
                    );
                    continue;
                };
                let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
                let indices = reader
                    .read_indices()
                    .map(|indices| indices.into_u32().collect())
                    .unwrap_or_else(|| (0..positions.len() as u32).collect());
                let Some(indices) = triangulate(primitive.mode(), indices) else {
                    tracing::debug!(
                        "{}: dropping {:?} primitive of '{}'",
                        source.path.display(),
                        primitive.mode(),
                        base_name
                    );
                    continue;
                };

                slots.push(meshes.len());
                meshes.push(DecodedMesh {
                    name: if split {
                        format!("{}_{}", base_name, primitive.index())
                    } else {
                        base_name.clone()
                    },
                    positions,
                    normals: reader
                        .read_normals()
                        .map(|normals| normals.map(Vec3::from).collect()),
                    tangents: reader
                        .read_tangents()
                        .map(|tangents| tangents.map(|[x, y, z, _]| Vec3::new(x, y, z)).collect()),
                    uvs: reader
                        .read_tex_coords(0)
                        .map(|uvs| uvs.into_f32().map(Vec2::from).collect()),
                    colors: reader
                        .read_colors(0)
                        .map(|colors| colors.into_rgb_f32().map(Vec3::from).collect()),
                    indices,
                    face_sizes: Vec::new(),
                });
            }
            mesh_map.push(slots);
        }

        let root = gltf
            .default_scene()
            .or_else(|| gltf.scenes().next())
            .map(|scene| {
                let mut roots: Vec<DecodedNode> = scene
                    .nodes()
                    .map(|node| convert_node(node, &mesh_map))
                    .collect();
                if roots.len() == 1 {
                    roots.remove(0)
                } else {
                    let mut root = DecodedNode::new("root");
                    root.children = roots;
                    root
                }
            });

        Ok(DecodedScene {
            incomplete: meshes.is_empty(),
            meshes,
            root,
        })
    }
}
