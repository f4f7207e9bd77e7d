mod common;

use common::synthetic_image::line_image;
use vessel_detector::classifier::SvmOptions;
use vessel_detector::error::Error;
use vessel_detector::fov::build_fov;
use vessel_detector::image::MaskImage;
use vessel_detector::linemask::LineMaskBank;
use vessel_detector::pipeline::{classify_image, train_model, ImageBundle, SegmenterParams};
use vessel_detector::protocol::Model;

fn line_params() -> SegmenterParams {
    SegmenterParams {
        svm: SvmOptions {
            probability: true,
            ..SvmOptions::default()
        },
        ..SegmenterParams::default()
    }
}

fn line_bundle(params: &SegmenterParams) -> ImageBundle {
    let (image, truth) = line_image(64, 64, 32, 22, 20, 0.2, 0.9);
    let fov =
        build_fov(&MaskImage::filled(64, 64), params.kernel_size).expect("non-empty raw mask");
    ImageBundle {
        image,
        fov,
        truth: Some(truth),
    }
}

#[test]
fn train_then_classify_recovers_a_synthetic_vessel() {
    let _ = env_logger::builder().is_test(true).try_init();
    let params = line_params();
    let bank = LineMaskBank::generate(params.kernel_size, params.rotation_resolution)
        .expect("valid parameters");
    let bundle = line_bundle(&params);

    let model = train_model(std::slice::from_ref(&bundle), &bank, &params)
        .expect("training on a two-class image succeeds");
    let report = classify_image(std::slice::from_ref(&bundle), &bank, &model, &params)
        .expect("single-image classification succeeds");

    assert!(
        report.probabilistic,
        "model trained with probability estimates must report calibrated scores"
    );
    let metrics = report.metrics.expect("bundle carries ground truth");
    assert!(
        metrics.accuracy >= 0.9,
        "in-sample accuracy {:.4} below 0.9",
        metrics.accuracy
    );

    // Sanity: strictly better than predicting the majority class everywhere.
    let truth = bundle.truth.as_ref().expect("ground truth present");
    let fov_pixels = bundle.fov.count_true();
    let vessel_pixels = truth
        .data
        .iter()
        .zip(&bundle.fov.data)
        .filter(|&(&t, &f)| t && f)
        .count();
    let baseline = (fov_pixels - vessel_pixels).max(vessel_pixels) as f64 / fov_pixels as f64;
    assert!(
        metrics.accuracy > baseline,
        "accuracy {:.4} does not beat the majority baseline {:.4}",
        metrics.accuracy,
        baseline
    );

    let roc = report.roc.expect("bundle carries ground truth");
    assert!(
        roc.area_under_curve > 0.95,
        "AUC {:.4} too low for a separable vessel",
        roc.area_under_curve
    );
}

#[test]
fn prediction_background_stays_clear() {
    let params = line_params();
    let bank = LineMaskBank::generate(params.kernel_size, params.rotation_resolution)
        .expect("valid parameters");
    let bundle = line_bundle(&params);

    let model =
        train_model(std::slice::from_ref(&bundle), &bank, &params).expect("training succeeds");
    let report = classify_image(std::slice::from_ref(&bundle), &bank, &model, &params)
        .expect("classification succeeds");

    // Pixels outside the field of view keep the background value.
    let prediction = &report.prediction;
    for y in 0..64 {
        for x in 0..64 {
            if !bundle.fov.get(x, y) {
                let i = y * 64 + x;
                assert!(!prediction.labels[i]);
                assert_eq!(prediction.scores[i], 0.0);
            }
        }
    }
}

#[test]
fn classifying_two_images_fails_eagerly() {
    let params = line_params();
    let bank = LineMaskBank::generate(params.kernel_size, params.rotation_resolution)
        .expect("valid parameters");
    let bundle = line_bundle(&params);

    let model =
        train_model(std::slice::from_ref(&bundle), &bank, &params).expect("training succeeds");
    let start = std::time::Instant::now();
    let err = classify_image(&[bundle.clone(), bundle], &bank, &model, &params)
        .expect_err("two images must be rejected");
    assert_eq!(err, Error::MultiImageClassification(2));
    // The check fires before feature extraction; nothing expensive ran.
    assert!(start.elapsed().as_millis() < 100);
}

#[test]
fn uncalibrated_model_reports_decision_scores() {
    let params = SegmenterParams::default();
    assert!(!params.svm.probability);
    let bank = LineMaskBank::generate(params.kernel_size, params.rotation_resolution)
        .expect("valid parameters");
    let bundle = line_bundle(&params);

    let model =
        train_model(std::slice::from_ref(&bundle), &bank, &params).expect("training succeeds");
    let report = classify_image(std::slice::from_ref(&bundle), &bank, &model, &params)
        .expect("classification succeeds");
    assert!(!report.probabilistic);
}

#[test]
fn empty_raw_mask_is_rejected() {
    let raw = MaskImage::new(64, 64);
    assert!(matches!(build_fov(&raw, 15), Err(Error::InvalidMask(_))));
}

#[test]
fn persisted_model_classifies_identically() {
    let params = line_params();
    let bank = LineMaskBank::generate(params.kernel_size, params.rotation_resolution)
        .expect("valid parameters");
    let bundle = line_bundle(&params);

    let model =
        train_model(std::slice::from_ref(&bundle), &bank, &params).expect("training succeeds");
    let json = serde_json::to_string(&model).expect("model serializes");
    let restored: Model = serde_json::from_str(&json).expect("model deserializes");

    let direct = classify_image(std::slice::from_ref(&bundle), &bank, &model, &params)
        .expect("classification succeeds");
    let roundtrip = classify_image(std::slice::from_ref(&bundle), &bank, &restored, &params)
        .expect("classification succeeds");
    assert_eq!(direct.prediction.labels, roundtrip.prediction.labels);
    assert_eq!(direct.prediction.scores, roundtrip.prediction.scores);
}
