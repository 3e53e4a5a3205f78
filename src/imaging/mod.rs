//! Image processing: sniff, decode, resize, encode to WebP.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | magic-byte sniff over the first 12 bytes |
//! | **Decode** | `image` (JPEG, PNG, WebP) → RGBA8 |
//! | **Resize** | bilinear resample, hand-written over RGBA8 |
//! | **Encode** | `webp` (libwebp lossy, quality 0–100) |
//!
//! The module is split into:
//! - **Format**: [`detect_format`] and [`SourceFormat`]
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: [`Quality`] and [`TransformOptions`]
//! - **Resample**: the bilinear scaler
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`transform`], the pipeline combining all of the above

pub mod backend;
mod calculations;
mod format;
pub mod operations;
mod params;
mod resample;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, ImageBackend};
pub use calculations::resolve_dimensions;
pub use format::{SNIFF_LEN, SourceFormat, detect_format};
pub use operations::{MAX_OUTPUT_DIMENSION, TransformError, transform};
pub use params::{Quality, TransformOptions};
pub use resample::{resample, resize_bilinear};
pub use rust_backend::RustBackend;

#[cfg(test)]
pub(crate) use backend::tests::MockBackend;
