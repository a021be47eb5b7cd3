use crate::costume::AssetFormat;
use crate::project::ProjectSettings;
use anyhow::{bail, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// Inputs smaller than this are never worth re-encoding.
const MIN_OPTIMIZE_BYTES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapFormat {
    Png,
    Jpeg,
}

impl BitmapFormat {
    pub fn asset_format(self) -> AssetFormat {
        match self {
            BitmapFormat::Png => AssetFormat::Png,
            BitmapFormat::Jpeg => AssetFormat::Jpg,
        }
    }
}

/// Raster encoder used for bitmap costumes.
pub trait ImageCodec {
    fn encode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u8,
        format: BitmapFormat,
        quality: u8,
    ) -> Result<Vec<u8>>;

    fn has_alpha_channel(&self, pixels: &[u8], channels: u8) -> bool {
        channels == 4 && pixels.chunks_exact(4).any(|px| px[3] < u8::MAX)
    }
}

/// `ImageCodec` backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn encode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u8,
        format: BitmapFormat,
        quality: u8,
    ) -> Result<Vec<u8>> {
        let color = match channels {
            1 => ExtendedColorType::L8,
            2 => ExtendedColorType::La8,
            3 => ExtendedColorType::Rgb8,
            4 => ExtendedColorType::Rgba8,
            other => bail!("unsupported channel count {}", other),
        };
        let mut out = Vec::new();
        match format {
            BitmapFormat::Png => PngEncoder::new(&mut out)
                .write_image(pixels, width, height, color)
                .context("encode png")?,
            BitmapFormat::Jpeg => JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
                .write_image(pixels, width, height, color)
                .context("encode jpeg")?,
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedBitmap {
    pub data: Vec<u8>,
    pub format: AssetFormat,
}

/// Re-encodes a bitmap costume: fully opaque images become JPEG at the
/// configured quality, anything with transparency stays PNG. Inputs that
/// cannot be decoded, or that are too small to matter, are returned as-is.
pub fn optimize_bitmap(
    codec: &dyn ImageCodec,
    data: Vec<u8>,
    format: AssetFormat,
    settings: &ProjectSettings,
) -> OptimizedBitmap {
    if !settings.compress_images || !format.is_bitmap() || data.len() < MIN_OPTIMIZE_BYTES {
        return OptimizedBitmap { data, format };
    }
    let decoded = match image::load_from_memory(&data) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::warn!(error = %err, "bitmap could not be decoded; keeping original bytes");
            return OptimizedBitmap { data, format };
        }
    };
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let (pixels, channels, target) = if codec.has_alpha_channel(rgba.as_raw(), 4) {
        (rgba.into_raw(), 4, BitmapFormat::Png)
    } else {
        let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();
        (rgb.into_raw(), 3, BitmapFormat::Jpeg)
    };
    match codec.encode(&pixels, width, height, channels, target, settings.quality) {
        Ok(encoded) => {
            tracing::debug!(
                before = data.len(),
                after = encoded.len(),
                format = ?target,
                "re-encoded bitmap costume"
            );
            OptimizedBitmap {
                data: encoded,
                format: target.asset_format(),
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "bitmap re-encode failed; keeping original bytes");
            OptimizedBitmap { data, format }
        }
    }
}
