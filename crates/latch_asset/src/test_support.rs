//! Fixtures shared by the unit tests

use crate::error::ImportError;
use crate::importer::decode::{DecodedMesh, DecodedNode, DecodedScene, SceneDecoder, SceneSource};
use image::{DynamicImage, ImageFormat};
use latch_core::math::{Mat4, Vec3};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed scene regardless of the source bytes.
pub struct FixedSceneDecoder {
    pub scene: DecodedScene,
    pub calls: AtomicUsize,
}

impl FixedSceneDecoder {
    pub fn new(scene: DecodedScene) -> Self {
        Self {
            scene,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SceneDecoder for FixedSceneDecoder {
    fn decode(&self, _source: &SceneSource<'_>) -> Result<DecodedScene, ImportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scene.clone())
    }
}

pub fn triangle(name: &str, offset: Vec3) -> DecodedMesh {
    DecodedMesh {
        name: name.to_string(),
        positions: vec![offset, offset + Vec3::X, offset + Vec3::Y],
        indices: vec![0, 1, 2],
        ..Default::default()
    }
}

/// Root plus two children, each child holding one triangle mesh.
pub fn two_mesh_scene() -> DecodedScene {
    let mut left = DecodedNode::new("Left");
    left.meshes.push(0);
    left.transform = Mat4::from_translation(Vec3::new(-2.0, 0.0, 0.0));
    let mut right = DecodedNode::new("Right");
    right.meshes.push(1);
    right.transform = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));

    let mut root = DecodedNode::new("RootNode");
    root.children = vec![left, right];

    DecodedScene {
        meshes: vec![
            triangle("Cube", Vec3::ZERO),
            triangle("Sphere", Vec3::new(0.0, 0.0, 1.0)),
        ],
        root: Some(root),
        incomplete: false,
    }
}

pub fn png_bytes(image: DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn rgb_png(width: u32, height: u32) -> Vec<u8> {
    png_bytes(DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 100, 50]),
    )))
}
