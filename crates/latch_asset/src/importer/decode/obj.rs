//! Wavefront OBJ decoder (geometry only, materials are ignored)

use super::{DecodedMesh, DecodedNode, DecodedScene, SceneDecoder, SceneSource};
use crate::error::ImportError;
use latch_core::math::{Vec2, Vec3};

#[derive(Debug, Default, Clone, Copy)]
pub struct ObjDecoder;

fn vec3s(flat: &[f32]) -> Vec<Vec3> {
    flat.chunks_exact(3).map(Vec3::from_slice).collect()
}

fn optional_vec3s(flat: &[f32]) -> Option<Vec<Vec3>> {
    (!flat.is_empty()).then(|| vec3s(flat))
}

impl SceneDecoder for ObjDecoder {
    fn decode(&self, source: &SceneSource<'_>) -> Result<DecodedScene, ImportError> {
        let load_opts = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let mut reader = source.bytes;
        let (models, _materials) = tobj::load_obj_buf(&mut reader, &load_opts, |_| {
            Ok((Vec::new(), Default::default()))
        })
        .map_err(|e| ImportError::SceneDecode {
            path: source.path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut root = DecodedNode::new("root");
        let mut meshes = Vec::with_capacity(models.len());
        for model in models {
            let mesh = model.mesh;
            if mesh.positions.is_empty() {
                continue;
            }
            let index = meshes.len();
            let positions = vec3s(&mesh.positions);
            let indices = if mesh.indices.is_empty() {
                (0..positions.len() as u32).collect()
            } else {
                mesh.indices
            };

            let mut node = DecodedNode::new(model.name.clone());
            node.meshes.push(index);
            root.children.push(node);

            meshes.push(DecodedMesh {
                name: model.name,
                positions,
                normals: optional_vec3s(&mesh.normals),
                tangents: None,
                uvs: (!mesh.texcoords.is_empty()).then(|| {
                    mesh.texcoords
                        .chunks_exact(2)
                        .map(Vec2::from_slice)
                        .collect()
                }),
                colors: optional_vec3s(&mesh.vertex_color),
                indices,
                face_sizes: mesh.face_arities,
            });
        }

        Ok(DecodedScene {
            incomplete: meshes.is_empty(),
            meshes,
            root: Some(root),
        })
    }
}
