//! Parameter types for the transform stage.
//!
//! - [`Quality`]: lossy WebP quality (0–100, default 80). Clamped on construction.
//! - [`TransformOptions`]: requested output size and quality for one request.

/// Quality setting for lossy WebP encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 100;

    pub fn new(value: u32) -> Self {
        Self(value.min(Self::MAX as u32) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Requested output of one transform.
///
/// `width`/`height` of `0` mean "derive from the source"; see
/// [`resolve_dimensions`](super::resolve_dimensions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformOptions {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

impl TransformOptions {
    pub fn new(width: u32, height: u32, quality: Quality) -> Self {
        Self {
            width,
            height,
            quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 0);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
    }

    #[test]
    fn default_options_keep_original_size() {
        let opts = TransformOptions::default();
        assert_eq!((opts.width, opts.height), (0, 0));
        assert_eq!(opts.quality, Quality::default());
    }
}
