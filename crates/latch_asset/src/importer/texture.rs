//! Texture importer

use super::{AssetImporter, ImportContext, SubAssetSink};
use crate::asset::{Asset, PixelFormat, TextureAsset};
use crate::error::ImportError;
use crate::metadata::AssetMetadata;
use crate::AssetType;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Decodes PNG/JPEG (and Radiance HDR) sources into RGBA pixel buffers.
///
/// RGB sources are promoted to RGBA; any other channel count than 3 or 4 is
/// rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextureImporter;

/// Header information read before any pixel is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub is_float: bool,
}

pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

pub fn decode_image(bytes: &[u8], path: &Path) -> Result<DecodedImage, ImportError> {
    let header_error = |source| ImportError::ImageHeader {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| header_error(image::ImageError::IoError(e)))?;
    let container = reader.format().ok_or_else(|| ImportError::UnknownImageFormat {
        path: path.to_path_buf(),
    })?;
    let decoder = reader.into_decoder().map_err(header_error)?;

    let (width, height) = decoder.dimensions();
    let header = ImageHeader {
        width,
        height,
        channels: decoder.color_type().channel_count(),
        is_float: matches!(container, ImageFormat::Hdr | ImageFormat::OpenExr),
    };
    match header.channels {
        3 | 4 => {}
        channels => {
            return Err(ImportError::UnsupportedChannels {
                path: path.to_path_buf(),
                channels,
            })
        }
    }

    let image = DynamicImage::from_decoder(decoder).map_err(|source| ImportError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;

    let (format, data) = if header.is_float {
        let pixels = image.to_rgba32f().into_raw();
        (
            PixelFormat::Rgba32F,
            bytemuck::cast_slice::<f32, u8>(&pixels).to_vec(),
        )
    } else {
        (PixelFormat::Rgba8, image.to_rgba8().into_raw())
    };

    tracing::debug!(
        "Decoded {} ({}x{}, {} channels, {:?})",
        path.display(),
        header.width,
        header.height,
        header.channels,
        format
    );

    Ok(DecodedImage {
        width: header.width,
        height: header.height,
        format,
        data,
    })
}

impl AssetImporter for TextureImporter {
    fn asset_type(&self) -> AssetType {
        AssetType::Texture
    }

    fn try_load(
        &self,
        metadata: &AssetMetadata,
        ctx: &ImportContext<'_>,
        _sub_assets: &mut dyn SubAssetSink,
    ) -> Result<Asset, ImportError> {
        let path = ctx.source_path(metadata);
        let settings = metadata
            .import_settings
            .texture()
            .copied()
            .ok_or_else(|| ImportError::SettingsMismatch {
                path: path.clone(),
                asset_type: AssetType::Texture,
            })?;

        let bytes = ctx.read_source(metadata)?;
        let image = decode_image(&bytes, &path)?;

        Ok(Asset::Texture(TextureAsset {
            handle: metadata.handle,
            data: image.data,
            width: image.width,
            height: image.height,
            format: image.format,
            filter: settings.filter,
            wrap: settings.wrap,
            generate_mips: settings.generate_mips,
            anisotropy: settings.anisotropy,
        }))
    }
}
