//! Source format sniffing from leading signature bytes.

/// Formats the decoder accepts, plus `Unknown` for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
    Unknown,
}

/// Bytes inspected by [`detect_format`]; shorter buffers are `Unknown`.
pub const SNIFF_LEN: usize = 12;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const RIFF: &[u8; 4] = b"RIFF";
const WEBP: &[u8; 4] = b"WEBP";

/// Identify the container format from the first 12 bytes.
///
/// | Format | Signature |
/// |---|---|
/// | JPEG | `FF D8` at 0 |
/// | PNG | `89 50 4E 47 0D 0A 1A 0A` at 0 |
/// | WebP | `RIFF` at 0, `WEBP` at 8 |
///
/// Matches are byte-exact.
pub fn detect_format(data: &[u8]) -> SourceFormat {
    if data.len() < SNIFF_LEN {
        return SourceFormat::Unknown;
    }

    if data[..2] == JPEG_SOI {
        SourceFormat::Jpeg
    } else if data[..8] == PNG_SIGNATURE {
        SourceFormat::Png
    } else if &data[..4] == RIFF && &data[8..12] == WEBP {
        SourceFormat::WebP
    } else {
        SourceFormat::Unknown
    }
}
