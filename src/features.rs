//! Per-pixel feature assembly and normalization.
//!
//! Flattens the field-of-view pixels into a fixed row-major order, pairs
//! each pixel's orientation responses (optionally followed by the raw
//! intensity) with its ground-truth label, and standardizes components with
//! statistics fitted once on the training pool. The raster order is
//! remembered per set so predictions can be scattered back to image
//! coordinates.

use crate::conv::ResponseStack;
use crate::image::{ImageF32, MaskImage};
use log::warn;
use serde::{Deserialize, Serialize};

/// Flattened feature vectors for the field-of-view pixels of one image.
#[derive(Clone, Debug)]
pub struct FeatureSet {
    /// Components per vector
    pub dim: usize,
    /// `dim * len()` values, vector-major
    pub vectors: Vec<f32>,
    /// Row-major flat pixel index of each vector, for scatter-back
    pub pixel_index: Vec<usize>,
    /// Ground-truth vessel labels, when available
    pub labels: Option<Vec<bool>>,
    /// Source image width in pixels
    pub width: usize,
    /// Source image height in pixels
    pub height: usize,
}

impl FeatureSet {
    /// Number of feature vectors (field-of-view pixels).
    #[inline]
    pub fn len(&self) -> usize {
        self.pixel_index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixel_index.is_empty()
    }

    /// Borrow vector `i`.
    #[inline]
    pub fn vector(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dim..(i + 1) * self.dim]
    }
}

/// Assemble one feature vector per field-of-view pixel, in row-major order.
pub fn build_features(
    responses: &ResponseStack,
    image: &ImageF32,
    fov: &MaskImage,
    truth: Option<&MaskImage>,
    include_intensity: bool,
) -> FeatureSet {
    let dim = responses.orientations + usize::from(include_intensity);
    let mut vectors = Vec::new();
    let mut pixel_index = Vec::new();
    let mut labels = truth.map(|_| Vec::new());

    for y in 0..fov.h {
        for x in 0..fov.w {
            if !fov.get(x, y) {
                continue;
            }
            vectors.extend_from_slice(responses.at(x, y));
            if include_intensity {
                vectors.push(image.get(x, y));
            }
            pixel_index.push(fov.idx(x, y));
            if let (Some(out), Some(t)) = (labels.as_mut(), truth) {
                out.push(t.get(x, y));
            }
        }
    }

    FeatureSet {
        dim,
        vectors,
        pixel_index,
        labels,
        width: fov.w,
        height: fov.h,
    }
}

/// Per-component mean and standard deviation, fitted once on the training
/// pool and stored in the model so inference reuses the exact same
/// statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationStats {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl NormalizationStats {
    /// Fit component-wise statistics over the pooled vectors of `sets`.
    ///
    /// A component with zero variance across the pool gets its standard
    /// deviation substituted with 1 (nothing was learned from it; scaling
    /// by zero would poison every vector) and a warning is logged.
    pub fn fit(sets: &[&FeatureSet]) -> Self {
        let dim = sets.first().map_or(0, |s| s.dim);
        let total: usize = sets.iter().map(|s| s.len()).sum();
        let mut sum = vec![0.0f64; dim];
        let mut sum_sq = vec![0.0f64; dim];

        for set in sets {
            for chunk in set.vectors.chunks_exact(dim) {
                for (c, &v) in chunk.iter().enumerate() {
                    let v = f64::from(v);
                    sum[c] += v;
                    sum_sq[c] += v * v;
                }
            }
        }

        let n = total.max(1) as f64;
        let mut mean = Vec::with_capacity(dim);
        let mut std = Vec::with_capacity(dim);
        for c in 0..dim {
            let m = sum[c] / n;
            let var = (sum_sq[c] / n - m * m).max(0.0);
            let s = var.sqrt();
            mean.push(m as f32);
            if s as f32 <= f32::EPSILON {
                warn!("feature component {c} has zero variance; leaving it unscaled");
                std.push(1.0);
            } else {
                std.push(s as f32);
            }
        }
        Self { mean, std }
    }

    /// Standardize `set` in place: `(v - mean) / std` per component.
    pub fn apply(&self, set: &mut FeatureSet) {
        debug_assert_eq!(set.dim, self.mean.len());
        for chunk in set.vectors.chunks_exact_mut(set.dim) {
            for (c, v) in chunk.iter_mut().enumerate() {
                *v = (*v - self.mean[c]) / self.std[c];
            }
        }
    }
}
