//! The fit/predict capability consumed by the classification protocol.
//!
//! The protocol only relies on the contract `fit(X, y) → model`,
//! `decision(model, x) → score`: the provided implementation is a linear
//! SVM trained with Pegasos-style stochastic subgradient descent on the
//! hinge loss, with class-balanced example weights (vessel pixels are a
//! small minority) and a seeded epoch shuffle for reproducible runs.
//! Optional sigmoid calibration (Platt scaling, fitted by Newton iteration
//! on the training decisions) turns decision values into probabilities.

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Training knobs for the linear SVM.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvmOptions {
    /// Fit a sigmoid on the decision values so `probability()` is defined.
    pub probability: bool,
    /// Full passes over the training pool.
    pub epochs: usize,
    /// L2 regularization strength.
    pub lambda: f32,
    /// Seed for the epoch shuffle.
    pub seed: u64,
}

impl Default for SvmOptions {
    fn default() -> Self {
        Self {
            probability: false,
            epochs: 50,
            lambda: 1e-4,
            seed: 42,
        }
    }
}

/// Sigmoid calibration parameters: `P(vessel | f) = 1 / (1 + exp(a·f + b))`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct PlattScale {
    a: f32,
    b: f32,
}

/// Trained linear decision function `w·x + bias`, immutable after `fit`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearSvm {
    weights: Vec<f32>,
    bias: f32,
    platt: Option<PlattScale>,
}

impl LinearSvm {
    /// Fit the decision function on `labels.len()` vectors of `dim`
    /// components stored contiguously in `vectors`.
    ///
    /// Expects standardized features; callers should apply
    /// [`NormalizationStats`](crate::features::NormalizationStats) first.
    pub fn fit(vectors: &[f32], dim: usize, labels: &[bool], options: &SvmOptions) -> Self {
        let n = labels.len();
        debug_assert_eq!(vectors.len(), n * dim);
        let positives = labels.iter().filter(|&&l| l).count();
        let negatives = n - positives;
        // Balance the hinge updates so the minority vessel class is not
        // drowned out by background pixels.
        let weight_pos = n as f32 / (2.0 * positives.max(1) as f32);
        let weight_neg = n as f32 / (2.0 * negatives.max(1) as f32);
        debug!(
            "svm fit: {n} samples ({positives} vessel / {negatives} background), dim={dim}, epochs={}",
            options.epochs
        );

        let mut weights = vec![0.0f32; dim];
        let mut bias = 0.0f32;
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut step = 0usize;

        for _ in 0..options.epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                step += 1;
                let eta = 1.0 / (1.0 + options.lambda * step as f32);
                let x = &vectors[i * dim..(i + 1) * dim];
                let y = if labels[i] { 1.0f32 } else { -1.0 };
                let class_weight = if labels[i] { weight_pos } else { weight_neg };

                let margin = y * (dot(&weights, x) + bias);
                let shrink = 1.0 - eta * options.lambda;
                if margin < 1.0 {
                    let push = eta * class_weight * y;
                    for (w, &xi) in weights.iter_mut().zip(x) {
                        *w = *w * shrink + push * xi;
                    }
                    bias += push;
                } else {
                    for w in &mut weights {
                        *w *= shrink;
                    }
                }
            }
        }

        let mut svm = Self {
            weights,
            bias,
            platt: None,
        };
        if options.probability {
            let decisions: Vec<f32> = (0..n)
                .map(|i| svm.decision(&vectors[i * dim..(i + 1) * dim]))
                .collect();
            svm.platt = Some(fit_sigmoid(&decisions, labels));
        }
        svm
    }

    /// Signed distance-like decision value; positive means vessel.
    #[inline]
    pub fn decision(&self, x: &[f32]) -> f32 {
        dot(&self.weights, x) + self.bias
    }

    /// Hard vessel/background call.
    #[inline]
    pub fn predict(&self, x: &[f32]) -> bool {
        self.decision(x) > 0.0
    }

    /// Calibrated vessel probability; `None` when the model was trained
    /// without probability estimates.
    pub fn probability(&self, x: &[f32]) -> Option<f32> {
        self.platt.map(|p| sigmoid_calibrated(self.decision(x), p))
    }

    /// Probability when calibrated, raw decision value otherwise.
    pub fn score(&self, x: &[f32]) -> f32 {
        match self.platt {
            Some(p) => sigmoid_calibrated(self.decision(x), p),
            None => self.decision(x),
        }
    }

    /// Whether the model carries a fitted sigmoid.
    pub fn has_probability(&self) -> bool {
        self.platt.is_some()
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn sigmoid_calibrated(decision: f32, platt: PlattScale) -> f32 {
    let t = platt.a * decision + platt.b;
    if t >= 0.0 {
        let e = (-t).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + t.exp())
    }
}

/// Platt scaling: fit `P(y=1|f) = 1 / (1 + exp(a·f + b))` by Newton
/// iteration on the regularized log-loss (Lin, Lin & Weng's formulation,
/// including the target smoothing prior).
fn fit_sigmoid(decisions: &[f32], labels: &[bool]) -> PlattScale {
    let n = decisions.len();
    let positives = labels.iter().filter(|&&l| l).count() as f64;
    let negatives = n as f64 - positives;
    let target_pos = (positives + 1.0) / (positives + 2.0);
    let target_neg = 1.0 / (negatives + 2.0);
    let targets: Vec<f64> = labels
        .iter()
        .map(|&l| if l { target_pos } else { target_neg })
        .collect();

    let mut a = 0.0f64;
    let mut b = ((negatives + 1.0) / (positives + 1.0)).ln();
    let mut loss = sigmoid_loss(decisions, &targets, a, b);

    for _ in 0..100 {
        // Gradient and Hessian of the log-loss in (a, b).
        let mut g_a = 0.0f64;
        let mut g_b = 0.0f64;
        let mut h_aa = 1e-12f64;
        let mut h_ab = 0.0f64;
        let mut h_bb = 1e-12f64;
        for (&f, &t) in decisions.iter().zip(&targets) {
            let f = f as f64;
            let fapb = a * f + b;
            let (p, q) = if fapb >= 0.0 {
                let e = (-fapb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = fapb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d1 = t - p;
            let d2 = p * q;
            g_a += f * d1;
            g_b += d1;
            h_aa += f * f * d2;
            h_ab += f * d2;
            h_bb += d2;
        }
        if g_a.abs() < 1e-5 && g_b.abs() < 1e-5 {
            break;
        }

        let det = h_aa * h_bb - h_ab * h_ab;
        let delta_a = -(h_bb * g_a - h_ab * g_b) / det;
        let delta_b = -(h_aa * g_b - h_ab * g_a) / det;

        // Backtracking line search along the Newton direction.
        let mut stepsize = 1.0f64;
        loop {
            let candidate = sigmoid_loss(decisions, &targets, a + stepsize * delta_a, b + stepsize * delta_b);
            if candidate < loss + 1e-4 * stepsize * (g_a * delta_a + g_b * delta_b) {
                a += stepsize * delta_a;
                b += stepsize * delta_b;
                loss = candidate;
                break;
            }
            stepsize *= 0.5;
            if stepsize < 1e-10 {
                return PlattScale {
                    a: a as f32,
                    b: b as f32,
                };
            }
        }
    }

    PlattScale {
        a: a as f32,
        b: b as f32,
    }
}

fn sigmoid_loss(decisions: &[f32], targets: &[f64], a: f64, b: f64) -> f64 {
    decisions
        .iter()
        .zip(targets)
        .map(|(&f, &t)| {
            let fapb = a * f as f64 + b;
            if fapb >= 0.0 {
                t * fapb + (1.0 + (-fapb).exp()).ln()
            } else {
                (t - 1.0) * fapb + (1.0 + fapb.exp()).ln()
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two clusters along the first component, clearly separable.
    fn toy_problem() -> (Vec<f32>, Vec<bool>) {
        let mut vectors = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let jitter = (i % 5) as f32 * 0.02;
            vectors.extend_from_slice(&[1.0 + jitter, 0.5 - jitter]);
            labels.push(true);
            vectors.extend_from_slice(&[-1.0 - jitter, -0.5 + jitter]);
            labels.push(false);
        }
        (vectors, labels)
    }

    #[test]
    fn separable_problem_is_learned() {
        let (vectors, labels) = toy_problem();
        let svm = LinearSvm::fit(&vectors, 2, &labels, &SvmOptions::default());
        for (i, &label) in labels.iter().enumerate() {
            assert_eq!(svm.predict(&vectors[i * 2..i * 2 + 2]), label, "sample {i}");
        }
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        let (vectors, labels) = toy_problem();
        let a = LinearSvm::fit(&vectors, 2, &labels, &SvmOptions::default());
        let b = LinearSvm::fit(&vectors, 2, &labels, &SvmOptions::default());
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.bias, b.bias);
    }

    #[test]
    fn calibrated_probabilities_follow_the_decision() {
        let (vectors, labels) = toy_problem();
        let options = SvmOptions {
            probability: true,
            ..SvmOptions::default()
        };
        let svm = LinearSvm::fit(&vectors, 2, &labels, &options);
        assert!(svm.has_probability());

        let p_pos = svm.probability(&[1.0, 0.5]).expect("calibrated model");
        let p_neg = svm.probability(&[-1.0, -0.5]).expect("calibrated model");
        assert!(p_pos > 0.5, "vessel-side probability {p_pos}");
        assert!(p_neg < 0.5, "background-side probability {p_neg}");
        assert!((0.0..=1.0).contains(&p_pos) && (0.0..=1.0).contains(&p_neg));
    }

    #[test]
    fn uncalibrated_model_exposes_no_probability() {
        let (vectors, labels) = toy_problem();
        let svm = LinearSvm::fit(&vectors, 2, &labels, &SvmOptions::default());
        assert!(svm.probability(&[1.0, 0.5]).is_none());
        // score() falls back to the raw decision value.
        assert_eq!(svm.score(&[1.0, 0.5]), svm.decision(&[1.0, 0.5]));
    }
}
