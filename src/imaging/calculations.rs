//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Resolve output dimensions from source and requested dimensions.
///
/// A requested dimension of `0` means "derive it":
///
/// | Requested | Output |
/// |---|---|
/// | `(0, 0)` | source size |
/// | `(0, h)` | `(floor(src_w * h / src_h), h)` |
/// | `(w, 0)` | `(w, floor(src_h * w / src_w))` |
/// | `(w, h)` | `(w, h)`, aspect ratio **not** preserved |
///
/// Each output dimension is raised to at least 1.
///
/// # Examples
/// ```
/// # use imgboost::imaging::resolve_dimensions;
/// assert_eq!(resolve_dimensions((100, 50), (200, 0)), (200, 100));
/// assert_eq!(resolve_dimensions((100, 50), (0, 25)), (50, 25));
/// ```
pub fn resolve_dimensions(source: (u32, u32), requested: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0 as u64, source.1 as u64);
    let (req_w, req_h) = (requested.0 as u64, requested.1 as u64);

    let (dst_w, dst_h) = match (req_w, req_h) {
        (0, 0) => (src_w, src_h),
        (0, h) => ((src_w * h).checked_div(src_h).unwrap_or(0), h),
        (w, 0) => (w, (src_h * w).checked_div(src_w).unwrap_or(0)),
        (w, h) => (w, h),
    };

    (clamp_dimension(dst_w), clamp_dimension(dst_h))
}

fn clamp_dimension(value: u64) -> u32 {
    value.clamp(1, u32::MAX as u64) as u32
}
