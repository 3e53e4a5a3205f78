//! Pure Rust decode + libwebp lossy encode.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode JPEG | `image` (`zune-jpeg` decoder) |
//! | Decode PNG | `image` (`png` decoder) |
//! | Decode WebP | `image` (`image-webp` decoder) |
//! | Expand to RGBA8 | `DynamicImage::to_rgba8` |
//! | Encode → WebP | `webp::Encoder::encode_simple` (lossy, quality 0–100) |
//!
//! Grayscale, palette and RGB sources expand to RGBA with A = 255;
//! 16-bit sources are reduced to 8 bits per channel.

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::format::SourceFormat;
use super::params::Quality;
use image::ImageFormat;

/// Production codec backend.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn image_format(format: SourceFormat) -> Option<ImageFormat> {
    match format {
        SourceFormat::Jpeg => Some(ImageFormat::Jpeg),
        SourceFormat::Png => Some(ImageFormat::Png),
        SourceFormat::WebP => Some(ImageFormat::WebP),
        SourceFormat::Unknown => None,
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, data: &[u8], format: SourceFormat) -> Result<DecodedImage, BackendError> {
        let image_format = image_format(format).ok_or(BackendError::UnsupportedFormat(format))?;
        let decoded = image::load_from_memory_with_format(data, image_format)
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        DecodedImage::new(rgba.into_raw(), width, height)
    }

    fn encode_webp(&self, image: &DecodedImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
        let encoder = webp::Encoder::from_rgba(image.pixels(), image.width(), image.height());
        let encoded = encoder
            .encode_simple(false, quality.value() as f32)
            .map_err(|e| BackendError::Encode(format!("{e:?}")))?;

        if encoded.is_empty() {
            return Err(BackendError::Encode("encoder produced no output".into()));
        }
        Ok(encoded.to_vec())
    }
}
