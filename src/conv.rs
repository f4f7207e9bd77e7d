//! Masked multi-orientation convolution.
//!
//! For every field-of-view pixel and every line mask, computes the mean
//! intensity over the mask's support centered on that pixel. A vessel
//! segment responds strongly at its own orientation and weakly elsewhere;
//! uniform background responds near-uniformly across orientations.
//!
//! Rows are independent, so the sweep runs row-parallel. Cost is
//! `O(H·W·r·k²)` restricted to field-of-view pixels; this is the dominant
//! stage of the pipeline, so progress is reported at debug level.

use crate::image::{ImageF32, MaskImage};
use crate::linemask::LineMaskBank;
use log::debug;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

const PROGRESS_ROWS: usize = 32;

/// Per-pixel orientation responses in row-major order: the `r` responses of
/// pixel `(x, y)` occupy `data[(y*w + x)*r .. (y*w + x + 1)*r]`. Responses
/// are zero outside the field of view.
#[derive(Clone, Debug)]
pub struct ResponseStack {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
    /// Number of orientations per pixel
    pub orientations: usize,
    data: Vec<f32>,
}

impl ResponseStack {
    /// Responses of pixel (x, y), one per orientation.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> &[f32] {
        let start = (y * self.width + x) * self.orientations;
        &self.data[start..start + self.orientations]
    }
}

/// Score every field-of-view pixel against the whole mask bank.
///
/// The field of view must already be eroded by the bank's kernel radius
/// (see [`build_fov`](crate::fov::build_fov)), which guarantees every mask
/// read stays inside the image.
pub fn score(image: &ImageF32, fov: &MaskImage, bank: &LineMaskBank) -> ResponseStack {
    let w = image.w;
    let h = image.h;
    let r = bank.len();
    let mut data = vec![0.0f32; w * h * r];
    let rows_done = AtomicUsize::new(0);

    data.par_chunks_mut(w * r)
        .enumerate()
        .for_each(|(y, row_out)| {
            let fov_row = fov.row(y);
            for x in 0..w {
                if !fov_row[x] {
                    continue;
                }
                let out = &mut row_out[x * r..(x + 1) * r];
                for (slot, mask) in out.iter_mut().zip(bank.masks()) {
                    let mut sum = 0.0f32;
                    for &(dx, dy) in mask.offsets() {
                        let px = (x as i32 + dx) as usize;
                        let py = (y as i32 + dy) as usize;
                        sum += image.get(px, py);
                    }
                    *slot = sum * mask.weight();
                }
            }
            let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_ROWS == 0 || done == h {
                debug!("convolution: {done}/{h} rows scored");
            }
        });

    ResponseStack {
        width: w,
        height: h,
        orientations: r,
        data,
    }
}
