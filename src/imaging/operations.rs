//! The transform pipeline: sniff → decode → resolve size → resample → encode.
//!
//! Runs synchronously inside a transform-pool task. Each step either hands a
//! value to the next or stops with a [`TransformError`]; nothing partially
//! processed is ever returned.

use super::backend::ImageBackend;
use super::calculations::resolve_dimensions;
use super::format::{SourceFormat, detect_format};
use super::params::TransformOptions;
use super::resample::resample;
use thiserror::Error;

/// Largest width or height a WebP image can have.
pub const MAX_OUTPUT_DIMENSION: u32 = 16383;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Unknown image format")]
    UnknownFormat,
    #[error("Failed to decode image")]
    Decode,
    #[error("WebP encoding failed")]
    Encode,
    #[error("Output size {width}x{height} is too large")]
    TooLarge { width: u32, height: u32 },
}

/// Transform raw source bytes into a WebP image per `options`.
pub fn transform(
    backend: &(impl ImageBackend + ?Sized),
    data: &[u8],
    options: &TransformOptions,
) -> Result<Vec<u8>, TransformError> {
    let format = detect_format(data);
    if format == SourceFormat::Unknown {
        return Err(TransformError::UnknownFormat);
    }

    let decoded = backend.decode(data, format).map_err(|e| {
        tracing::debug!(?format, "decode failed: {e}");
        TransformError::Decode
    })?;

    let source = decoded.dimensions();
    let target = resolve_dimensions(source, (options.width, options.height));
    tracing::debug!(?format, ?source, ?target, "resolved output size");

    let too_large = TransformError::TooLarge {
        width: target.0,
        height: target.1,
    };
    if target.0 > MAX_OUTPUT_DIMENSION || target.1 > MAX_OUTPUT_DIMENSION {
        return Err(too_large);
    }
    let resized = resample(decoded, target).map_err(|e| {
        tracing::warn!("resample failed: {e}");
        too_large
    })?;

    let encoded = backend
        .encode_webp(&resized, options.quality)
        .map_err(|e| {
            tracing::debug!("encode failed: {e}");
            TransformError::Encode
        })?;
    if encoded.is_empty() {
        return Err(TransformError::Encode);
    }
    Ok(encoded)
}
