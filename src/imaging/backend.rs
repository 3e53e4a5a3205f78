//! Codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between the transform pipeline and
//! the codec libraries: decode a JPEG/PNG/WebP byte stream into RGBA, and
//! encode RGBA into lossy WebP. Both are ordinary fallible calls.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::format::SourceFormat;
use super::params::Quality;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Unsupported source format: {0:?}")]
    UnsupportedFormat(SourceFormat),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Invalid pixel buffer: {len} bytes for {width}x{height}")]
    InvalidBuffer { len: usize, width: u32, height: u32 },
    #[error("Cannot allocate a {width}x{height} pixel buffer")]
    Allocation { width: u32, height: u32 },
}

/// A decoded image as a flat RGBA8 buffer, row-major.
///
/// The buffer is always exactly `width * height * 4` bytes and both
/// dimensions are non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl DecodedImage {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self, BackendError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));
        if width == 0 || height == 0 || expected != Some(pixels.len()) {
            return Err(BackendError::InvalidBuffer {
                len: pixels.len(),
                width,
                height,
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// Wrap a buffer the caller sized as `width * height * 4` itself.
    pub(super) fn from_raw_parts(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Codec operations the transform stage depends on.
pub trait ImageBackend: Send + Sync {
    /// Decode `data`, already identified as `format`, to RGBA8.
    ///
    /// Sources without alpha decode with A = 255.
    fn decode(&self, data: &[u8], format: SourceFormat) -> Result<DecodedImage, BackendError>;

    /// Encode an RGBA8 image as lossy WebP.
    fn encode_webp(&self, image: &DecodedImage, quality: Quality) -> Result<Vec<u8>, BackendError>;
}
