//! Bilinear resampling of RGBA8 buffers.
//!
//! Output pixel `(x, y)` maps to source position
//! `gx = x * (src_w - 1) / dst_w`, `gy = y * (src_h - 1) / dst_h`. The four
//! neighbours of `(floor(gx), floor(gy))` are blended per channel (alpha
//! included) with weights `(1-fx)(1-fy)`, `fx(1-fy)`, `(1-fx)fy`, `fx·fy`,
//! and the result is truncated to `u8`. A neighbour past the right or bottom
//! edge reuses the top-left corner value.

use super::backend::{BackendError, DecodedImage};

/// Resize `image` to `dst`, passing it through untouched when the size already matches.
pub fn resample(image: DecodedImage, dst: (u32, u32)) -> Result<DecodedImage, BackendError> {
    if image.dimensions() == dst {
        return Ok(image);
    }
    resize_bilinear(&image, dst.0, dst.1)
}

/// Bilinear resize to `dst_width` x `dst_height` (both non-zero).
///
/// The output buffer is reserved up front; if that fails the call returns
/// [`BackendError::Allocation`] instead of aborting.
pub fn resize_bilinear(src: &DecodedImage, dst_width: u32, dst_height: u32) -> Result<DecodedImage, BackendError> {
    let (sw, sh) = (src.width() as usize, src.height() as usize);
    let (dw, dh) = (dst_width.max(1) as usize, dst_height.max(1) as usize);
    let pixels = src.pixels();

    let x_ratio = (sw - 1) as f32 / dw as f32;
    let y_ratio = (sh - 1) as f32 / dh as f32;

    let too_big = || BackendError::Allocation {
        width: dw as u32,
        height: dh as u32,
    };
    let len = dw.checked_mul(dh).and_then(|n| n.checked_mul(4)).ok_or_else(too_big)?;
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|_| too_big())?;
    out.resize(len, 0u8);
    for y in 0..dh {
        let gy = y as f32 * y_ratio;
        let gyi = (gy as usize).min(sh - 1);
        let fy = gy - gyi as f32;

        for x in 0..dw {
            let gx = x as f32 * x_ratio;
            let gxi = (gx as usize).min(sw - 1);
            let fx = gx - gxi as f32;

            let [c00, c10, c01, c11] = corners(pixels, sw, sh, gxi, gyi);
            let w00 = (1.0 - fx) * (1.0 - fy);
            let w10 = fx * (1.0 - fy);
            let w01 = (1.0 - fx) * fy;
            let w11 = fx * fy;

            let dst = (y * dw + x) * 4;
            for c in 0..4 {
                let (a, b, d, e) = (c00[c], c10[c], c01[c], c11[c]);
                let value = a as f32 * w00 + b as f32 * w10 + d as f32 * w01 + e as f32 * w11;
                // f32 rounding can land a hair outside the corner range.
                let lo = a.min(b).min(d).min(e) as f32;
                let hi = a.max(b).max(d).max(e) as f32;
                out[dst + c] = value.clamp(lo, hi) as u8;
            }
        }
    }

    Ok(DecodedImage::from_raw_parts(out, dw as u32, dh as u32))
}

/// The four RGBA neighbours `[(x,y), (x+1,y), (x,y+1), (x+1,y+1)]`.
fn corners(pixels: &[u8], width: usize, height: usize, x: usize, y: usize) -> [[u8; 4]; 4] {
    let at = |px: usize, py: usize| -> [u8; 4] {
        let i = (py * width + px) * 4;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    };

    let has_right = x + 1 < width;
    let has_below = y + 1 < height;
    let c00 = at(x, y);
    let c10 = if has_right { at(x + 1, y) } else { c00 };
    let c01 = if has_below { at(x, y + 1) } else { c00 };
    let c11 = if has_right && has_below {
        at(x + 1, y + 1)
    } else {
        c00
    };
    [c00, c10, c01, c11]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn image(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> DecodedImage {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        DecodedImage::new(pixels, width, height).unwrap()
    }

    fn pixel(img: &DecodedImage, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * img.width() + x) * 4) as usize;
        let p = img.pixels();
        [p[i], p[i + 1], p[i + 2], p[i + 3]]
    }

    #[test]
    fn same_size_is_passed_through_unchanged() {
        let src = image(5, 3, |x, y| [(x * 40) as u8, (y * 80) as u8, 7, 200]);
        let out = resample(src.clone(), (5, 3)).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn output_has_requested_dimensions_and_buffer_length() {
        let src = image(4, 4, |_, _| [1, 2, 3, 4]);
        let out = resample(src, (8, 3)).unwrap();
        assert_eq!(out.dimensions(), (8, 3));
        assert_eq!(out.pixels().len(), 8 * 3 * 4);
    }

    #[test]
    fn solid_color_stays_solid() {
        let src = image(7, 5, |_, _| [200, 100, 50, 255]);
        let out = resample(src, (13, 2)).unwrap();
        assert!(out.pixels().chunks(4).all(|p| p == [200, 100, 50, 255]));
    }

    #[test]
    fn first_output_pixel_is_source_origin() {
        let src = image(4, 4, |x, y| [(x * 60) as u8, (y * 60) as u8, 0, 255]);
        let out = resample(src.clone(), (2, 2)).unwrap();
        assert_eq!(pixel(&out, 0, 0), pixel(&src, 0, 0));
    }

    #[test]
    fn horizontal_gradient_interpolates_and_truncates() {
        // 2x1 source: red 0 → 100. Upscale to 4x1:
        // x_ratio = 1/4 → gx = 0, .25, .5, .75 → 0, 25, 50, 75
        let src = image(2, 1, |x, _| [(x * 100) as u8, 0, 0, 255]);
        let out = resample(src, (4, 1)).unwrap();
        let reds: Vec<u8> = out.pixels().chunks(4).map(|p| p[0]).collect();
        assert_eq!(reds, vec![0, 25, 50, 75]);
    }

    #[test]
    fn alpha_channel_is_interpolated() {
        let src = image(2, 1, |x, _| [0, 0, 0, if x == 0 { 0 } else { 255 }]);
        let out = resample(src, (2, 2)).unwrap();
        // gx for x=1: 1 * (1/2) = 0.5 → alpha 127.5 → 127
        assert_eq!(pixel(&out, 1, 0)[3], 127);
        assert_eq!(pixel(&out, 0, 0)[3], 0);
    }

    #[test]
    fn single_pixel_source_fills_output() {
        let src = image(1, 1, |_, _| [9, 8, 7, 6]);
        let out = resample(src, (3, 4)).unwrap();
        assert!(out.pixels().chunks(4).all(|p| p == [9, 8, 7, 6]));
    }

    #[test]
    fn edge_neighbours_reuse_origin_corner() {
        let src = image(2, 2, |x, y| [(x * 10 + y * 100) as u8, 0, 0, 0]);
        let pixels = src.pixels();
        // Bottom-right: no right and no below neighbour.
        let c = corners(pixels, 2, 2, 1, 1);
        assert!(c.iter().all(|p| *p == [110, 0, 0, 0]));
        // Right column: below exists, right does not.
        let c = corners(pixels, 2, 2, 1, 0);
        assert_eq!(c[0], [10, 0, 0, 0]);
        assert_eq!(c[1], [10, 0, 0, 0]);
        assert_eq!(c[2], [110, 0, 0, 0]);
        assert_eq!(c[3], [10, 0, 0, 0]);
    }

    #[test]
    fn downscale_stays_within_source_range() {
        let src = image(64, 48, |x, y| [(x * 4) as u8, (y * 5) as u8, ((x + y) % 256) as u8, 255]);
        let out = resample(src, (10, 7)).unwrap();
        assert_eq!(out.dimensions(), (10, 7));
        assert!(out.pixels().chunks(4).all(|p| p[3] == 255));
    }

    #[test]
    fn unallocatable_output_is_an_error() {
        let src = image(1, 1, |_, _| [0, 0, 0, 255]);
        let err = resize_bilinear(&src, u32::MAX, u32::MAX).unwrap_err();
        assert_eq!(
            err,
            BackendError::Allocation {
                width: u32::MAX,
                height: u32::MAX
            }
        );
    }

    fn arb_image() -> impl Strategy<Value = DecodedImage> {
        (1u32..12, 1u32..12).prop_flat_map(|(w, h)| {
            proptest::collection::vec(any::<u8>(), (w * h * 4) as usize)
                .prop_map(move |pixels| DecodedImage::new(pixels, w, h).unwrap())
        })
    }

    proptest! {
        #[test]
        fn output_channels_lie_within_sampled_corners(
            src in arb_image(),
            dw in 1u32..20,
            dh in 1u32..20,
        ) {
            let out = resize_bilinear(&src, dw, dh).unwrap();
            let (sw, sh) = (src.width() as usize, src.height() as usize);
            let x_ratio = (sw - 1) as f32 / dw as f32;
            let y_ratio = (sh - 1) as f32 / dh as f32;

            for y in 0..dh as usize {
                let gyi = ((y as f32 * y_ratio) as usize).min(sh - 1);
                for x in 0..dw as usize {
                    let gxi = ((x as f32 * x_ratio) as usize).min(sw - 1);
                    let quad = corners(src.pixels(), sw, sh, gxi, gyi);
                    let got = pixel(&out, x as u32, y as u32);
                    for c in 0..4 {
                        let lo = quad.iter().map(|p| p[c]).min().unwrap();
                        let hi = quad.iter().map(|p| p[c]).max().unwrap();
                        prop_assert!(got[c] >= lo && got[c] <= hi,
                            "pixel ({x},{y}) channel {c}: {} not in [{lo},{hi}]", got[c]);
                    }
                }
            }
        }

        #[test]
        fn resizing_to_own_size_is_identity(src in arb_image()) {
            let dims = src.dimensions();
            prop_assert_eq!(resample(src.clone(), dims).unwrap(), src);
        }
    }
}
