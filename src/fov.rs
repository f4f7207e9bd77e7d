//! Field-of-view construction.
//!
//! The raw mask delivered with each database image marks the camera's
//! visible retinal disk. Before feature extraction it is eroded by the
//! kernel radius with a square structuring element (run as two separable
//! 1D passes) so that no line mask ever reads outside the mask or the image
//! border.

use crate::error::{Error, Result};
use crate::image::{ImageF32, MaskImage};

/// Erode `raw` by `kernel_size / 2` in every direction, also clearing
/// anything within that distance of the image border.
///
/// Fails with [`Error::InvalidMask`] when the raw mask has no `true`
/// pixels.
pub fn build_fov(raw: &MaskImage, kernel_size: usize) -> Result<MaskImage> {
    if raw.count_true() == 0 {
        return Err(Error::InvalidMask(
            "raw mask has no visible pixels".to_string(),
        ));
    }
    let radius = kernel_size / 2;
    let horizontal = erode_rows(raw, radius);
    Ok(erode_columns(&horizontal, radius))
}

/// Require an image and mask of identical dimensions.
pub fn check_dimensions(image: &ImageF32, mask: &MaskImage) -> Result<()> {
    if image.w != mask.w || image.h != mask.h {
        return Err(Error::InvalidMask(format!(
            "mask is {}x{} but image is {}x{}",
            mask.w, mask.h, image.w, image.h
        )));
    }
    Ok(())
}

fn erode_rows(src: &MaskImage, radius: usize) -> MaskImage {
    let mut out = MaskImage::new(src.w, src.h);
    let r = radius as isize;
    for y in 0..src.h {
        let row = src.row(y);
        for x in 0..src.w {
            let lo = x as isize - r;
            let hi = x as isize + r;
            // Windows touching the border erode away entirely.
            let keep = lo >= 0
                && hi < src.w as isize
                && row[lo as usize..=hi as usize].iter().all(|&v| v);
            out.set(x, y, keep);
        }
    }
    out
}

fn erode_columns(src: &MaskImage, radius: usize) -> MaskImage {
    let mut out = MaskImage::new(src.w, src.h);
    let r = radius as isize;
    for y in 0..src.h {
        let lo = y as isize - r;
        let hi = y as isize + r;
        if lo < 0 || hi >= src.h as isize {
            continue;
        }
        for x in 0..src.w {
            let keep = (lo..=hi).all(|yy| src.get(x, yy as usize));
            out.set(x, y, keep);
        }
    }
    out
}
