//! Run-level driver tying the stages together.
//!
//! A run loads one or more [`ImageBundle`]s, builds the line mask bank
//! once, and either trains a model from every bundle or classifies exactly
//! one bundle and assesses the result. The multi-image classification
//! restriction is checked eagerly, before any feature computation is
//! spent.

use crate::classifier::SvmOptions;
use crate::conv;
use crate::error::{Error, Result};
use crate::features::{build_features, FeatureSet};
use crate::fov::check_dimensions;
use crate::image::{ImageF32, MaskImage};
use crate::instrument::{timed, StageTiming};
use crate::linemask::LineMaskBank;
use crate::protocol::{self, Metrics, Model, PredictionImage, RocCurve};
use log::info;
use serde::{Deserialize, Serialize};

/// One database image with its eroded field of view and, when available,
/// the manual segmentation.
#[derive(Clone, Debug)]
pub struct ImageBundle {
    pub image: ImageF32,
    pub fov: MaskImage,
    pub truth: Option<MaskImage>,
}

/// Pipeline-wide parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmenterParams {
    /// Line mask side length (odd, ≥ 3)
    pub kernel_size: usize,
    /// Orientations sampled in [0°, 180°)
    pub rotation_resolution: usize,
    /// Append the raw intensity to each feature vector
    pub include_intensity: bool,
    /// Classifier training knobs
    pub svm: SvmOptions,
}

impl Default for SegmenterParams {
    fn default() -> Self {
        Self {
            kernel_size: 15,
            rotation_resolution: 15,
            include_intensity: true,
            svm: SvmOptions::default(),
        }
    }
}

/// Everything the classify mode produces for one image.
#[derive(Clone, Debug)]
pub struct ClassifyReport {
    pub prediction: PredictionImage,
    /// Whether the prediction scores are calibrated probabilities or raw
    /// decision values
    pub probabilistic: bool,
    /// Present when the bundle carried ground truth
    pub metrics: Option<Metrics>,
    /// Present when the bundle carried ground truth
    pub roc: Option<RocCurve>,
    pub timings: Vec<StageTiming>,
}

/// Score a bundle against the bank and assemble its feature set.
pub fn extract_features(
    bundle: &ImageBundle,
    bank: &LineMaskBank,
    include_intensity: bool,
) -> Result<FeatureSet> {
    check_dimensions(&bundle.image, &bundle.fov)?;
    if let Some(truth) = &bundle.truth {
        check_dimensions(&bundle.image, truth)?;
    }
    let responses = conv::score(&bundle.image, &bundle.fov, bank);
    Ok(build_features(
        &responses,
        &bundle.image,
        &bundle.fov,
        bundle.truth.as_ref(),
        include_intensity,
    ))
}

/// Train a model from every supplied bundle.
pub fn train_model(
    bundles: &[ImageBundle],
    bank: &LineMaskBank,
    params: &SegmenterParams,
) -> Result<Model> {
    info!(
        "calculating, normalizing feature vectors for {} image(s)",
        bundles.len()
    );
    let (sets, _) = timed("feature extraction", || {
        bundles
            .iter()
            .map(|b| extract_features(b, bank, params.include_intensity))
            .collect::<Result<Vec<_>>>()
    });
    let (model, _) = timed("model training", || protocol::train(sets?, &params.svm));
    model
}

/// Classify exactly one bundle and assess it against its ground truth.
///
/// Fails with [`Error::MultiImageClassification`] when more than one bundle
/// is supplied, before any feature computation starts.
pub fn classify_image(
    bundles: &[ImageBundle],
    bank: &LineMaskBank,
    model: &Model,
    params: &SegmenterParams,
) -> Result<ClassifyReport> {
    if bundles.len() > 1 {
        return Err(Error::MultiImageClassification(bundles.len()));
    }
    let bundle = bundles
        .first()
        .ok_or_else(|| Error::InvalidParameter("no image to classify".to_string()))?;

    let mut timings = Vec::new();
    info!("calculating, normalizing feature vectors for image");
    let (set, timing) = timed("feature extraction", || {
        extract_features(bundle, bank, params.include_intensity)
    });
    timings.push(timing);
    let set = set?;

    info!("classifying image pixels");
    let (classification, timing) = timed("classification", || protocol::classify(set, model));
    timings.push(timing);

    let (metrics, roc) = match &bundle.truth {
        Some(truth) => {
            let metrics = protocol::assess(truth, &classification);
            info!(
                "accuracy {:.4}, sensitivity {:.4}, specificity {:.4}",
                metrics.accuracy, metrics.sensitivity, metrics.specificity
            );
            let curve = protocol::roc(truth, &classification);
            info!("ROC area under curve {:.4}", curve.area_under_curve);
            (Some(metrics), Some(curve))
        }
        None => (None, None),
    };

    let probabilistic = classification.probabilistic;
    Ok(ClassifyReport {
        prediction: classification.into_prediction_image(),
        probabilistic,
        metrics,
        roc,
        timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_image_classification_fails_before_any_work() {
        let bundle = ImageBundle {
            image: ImageF32::new(8, 8),
            // Deliberately broken: dimension checks would reject this, but
            // the eager count check must fire first.
            fov: MaskImage::filled(4, 4),
            truth: None,
        };
        let model = unreachable_model();
        let bank = LineMaskBank::generate(3, 1).expect("valid parameters");
        let err = classify_image(
            &[bundle.clone(), bundle],
            &bank,
            &model,
            &SegmenterParams::default(),
        )
        .expect_err("two bundles must be rejected");
        assert_eq!(err, Error::MultiImageClassification(2));
    }

    fn unreachable_model() -> Model {
        // classify_image must error out before ever touching the model.
        serde_json::from_str(
            r#"{"stats":{"mean":[0.0],"std":[1.0]},
                "svm":{"weights":[0.0],"bias":0.0,"platt":null}}"#,
        )
        .expect("valid model JSON")
    }
}
