//! Train → classify → assess protocol over per-pixel feature vectors.
//!
//! Training pools the feature vectors of one or more labeled images, fits
//! normalization statistics once, and hands the standardized pool to the
//! classifier capability. Classification reuses the model's stored
//! statistics (never refit), scores a single image's vectors in their
//! original raster order, and scatters the result back into a prediction
//! raster. Assessment compares predictions to ground truth inside the
//! field of view only.

use crate::classifier::{LinearSvm, SvmOptions};
use crate::error::{Error, Result};
use crate::features::{FeatureSet, NormalizationStats};
use crate::image::MaskImage;
use log::info;
use serde::{Deserialize, Serialize};

/// Trained classifier state plus the normalization statistics that
/// produced its training features. Immutable after training; JSON
/// round-trippable so the driver can persist it between runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub stats: NormalizationStats,
    svm: LinearSvm,
}

/// Per-pixel scores and hard calls for one image, in the feature set's
/// raster order.
#[derive(Clone, Debug)]
pub struct Classification {
    /// Calibrated probability per pixel when the model was trained with
    /// probability estimates, raw decision value otherwise
    pub scores: Vec<f32>,
    /// Hard vessel/background call per pixel
    pub predictions: Vec<bool>,
    /// Whether `scores` holds calibrated probabilities
    pub probabilistic: bool,
    pixel_index: Vec<usize>,
    width: usize,
    height: usize,
}

/// Prediction scattered back to image coordinates. Pixels outside the
/// field of view carry `false` / 0.0.
#[derive(Clone, Debug)]
pub struct PredictionImage {
    pub width: usize,
    pub height: usize,
    /// Hard labels in row-major order
    pub labels: Vec<bool>,
    /// Scores in row-major order (background pixels 0.0)
    pub scores: Vec<f32>,
}

impl Classification {
    /// Scatter the flat predictions back through the remembered raster
    /// order.
    pub fn into_prediction_image(self) -> PredictionImage {
        let mut labels = vec![false; self.width * self.height];
        let mut scores = vec![0.0f32; self.width * self.height];
        for (i, &flat) in self.pixel_index.iter().enumerate() {
            labels[flat] = self.predictions[i];
            scores[flat] = self.scores[i];
        }
        PredictionImage {
            width: self.width,
            height: self.height,
            labels,
            scores,
        }
    }

    /// Flat pixel indices aligned with `scores` / `predictions`.
    pub fn pixel_index(&self) -> &[usize] {
        &self.pixel_index
    }
}

/// Pool the supplied feature sets, fit normalization statistics, and train
/// the classifier.
///
/// Fails with [`Error::InvalidTrainingSet`] when any set lacks labels or
/// the pooled labels contain fewer than two classes.
pub fn train(mut sets: Vec<FeatureSet>, options: &SvmOptions) -> Result<Model> {
    if sets.is_empty() {
        return Err(Error::InvalidTrainingSet("no feature sets".to_string()));
    }
    if sets.iter().any(|s| s.labels.is_none()) {
        return Err(Error::InvalidTrainingSet(
            "ground truth is required for every training image".to_string(),
        ));
    }

    let stats = NormalizationStats::fit(&sets.iter().collect::<Vec<_>>());
    for set in &mut sets {
        stats.apply(set);
    }

    let dim = sets[0].dim;
    let total: usize = sets.iter().map(|s| s.len()).sum();
    let mut vectors = Vec::with_capacity(total * dim);
    let mut labels = Vec::with_capacity(total);
    for set in &sets {
        vectors.extend_from_slice(&set.vectors);
        labels.extend_from_slice(set.labels.as_deref().unwrap_or(&[]));
    }

    let positives = labels.iter().filter(|&&l| l).count();
    if positives == 0 || positives == labels.len() {
        return Err(Error::InvalidTrainingSet(
            "training pool contains a single label class".to_string(),
        ));
    }

    info!(
        "training classifier on {} pooled vectors from {} image(s); this is a lengthy process",
        labels.len(),
        sets.len()
    );
    let svm = LinearSvm::fit(&vectors, dim, &labels, options);
    Ok(Model { stats, svm })
}

/// Score one image's feature vectors with a trained model.
///
/// Normalizes with the model's stored statistics and returns scores and
/// hard predictions in the set's raster order.
pub fn classify(mut set: FeatureSet, model: &Model) -> Classification {
    model.stats.apply(&mut set);
    let n = set.len();
    let mut scores = Vec::with_capacity(n);
    let mut predictions = Vec::with_capacity(n);
    for i in 0..n {
        let x = set.vector(i);
        scores.push(model.svm.score(x));
        predictions.push(model.svm.predict(x));
    }
    Classification {
        scores,
        predictions,
        probabilistic: model.svm.has_probability(),
        pixel_index: set.pixel_index,
        width: set.width,
        height: set.height,
    }
}

/// Confusion counts and derived rates over the field-of-view pixels.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    pub accuracy: f64,
    pub sensitivity: f64,
    pub specificity: f64,
}

/// Compare hard predictions to ground truth, pixel by pixel, restricted to
/// the classified (field-of-view) pixels.
pub fn assess(truth: &MaskImage, classification: &Classification) -> Metrics {
    let mut m = Metrics::default();
    for (i, &flat) in classification.pixel_index.iter().enumerate() {
        match (classification.predictions[i], truth.data[flat]) {
            (true, true) => m.true_positives += 1,
            (true, false) => m.false_positives += 1,
            (false, false) => m.true_negatives += 1,
            (false, true) => m.false_negatives += 1,
        }
    }
    let total = m.true_positives + m.false_positives + m.true_negatives + m.false_negatives;
    m.accuracy = ratio(m.true_positives + m.true_negatives, total);
    m.sensitivity = ratio(m.true_positives, m.true_positives + m.false_negatives);
    m.specificity = ratio(m.true_negatives, m.true_negatives + m.false_positives);
    m
}

/// One operating point of the ROC sweep.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RocPoint {
    pub threshold: f32,
    pub true_positive_rate: f64,
    pub false_positive_rate: f64,
}

/// ROC curve swept over the score threshold, for downstream plotting.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub area_under_curve: f64,
}

/// Sweep the score threshold from permissive to strict, computing the
/// true-positive and false-positive rate at each distinct score.
pub fn roc(truth: &MaskImage, classification: &Classification) -> RocCurve {
    let mut pairs: Vec<(f32, bool)> = classification
        .pixel_index
        .iter()
        .enumerate()
        .map(|(i, &flat)| (classification.scores[i], truth.data[flat]))
        .collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let positives = pairs.iter().filter(|&&(_, t)| t).count();
    let negatives = pairs.len() - positives;

    let mut points = vec![RocPoint {
        threshold: f32::INFINITY,
        true_positive_rate: 0.0,
        false_positive_rate: 0.0,
    }];
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0usize;
    while i < pairs.len() {
        let threshold = pairs[i].0;
        // Consume every pair sharing this score before emitting a point.
        while i < pairs.len() && pairs[i].0 == threshold {
            if pairs[i].1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            threshold,
            true_positive_rate: ratio(tp, positives),
            false_positive_rate: ratio(fp, negatives),
        });
    }

    let area_under_curve = points
        .windows(2)
        .map(|pair| {
            let dx = pair[1].false_positive_rate - pair[0].false_positive_rate;
            0.5 * dx * (pair[0].true_positive_rate + pair[1].true_positive_rate)
        })
        .sum();
    RocCurve {
        points,
        area_under_curve,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
