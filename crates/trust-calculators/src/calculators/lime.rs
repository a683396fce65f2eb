//! Local surrogate fidelity (LIME-style).
//!
//! Around every test row, perturbed copies are drawn from a Gaussian whose
//! per-feature width is the training standard deviation. The classifier's
//! probability for the predicted class on those copies is approximated by a
//! proximity-weighted ridge regression; the weighted R² of that surrogate is
//! the trust score. A classifier whose local surface a linear model cannot
//! follow gets a low score.
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, ArrayView1};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

use crate::budget::Budget;
use crate::calculators::{
    check_feature_width, check_norm, check_probabilities, derive_seed, score_rows, RowOutcome,
    TrustResult, TrustStrategy,
};
use crate::data_handling::TrainingData;
use crate::error::{Result, TrustError};
use crate::models::classifier_trait::ClassifierModel;
use crate::preprocessing::{fit_scaler, Scaler};
use crate::stats::{row_argmax, weighted_r2};

/// Ridge penalty of the surrogate.
const RIDGE_ALPHA: f64 = 1.0;

/// A fitted local surrogate for one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalExplanation {
    /// Name of the class being explained
    pub label: String,
    pub intercept: f64,
    /// Surrogate coefficient per feature name, on standardized offsets
    pub weights: Vec<(String, f64)>,
    /// Weighted R² of the surrogate, clamped to [0, 1]
    pub fidelity: f64,
}

pub struct LimeTrust {
    scaler: Scaler,
    feature_names: Vec<String>,
    label_names: Vec<String>,
    num_samples: usize,
    kernel_width: f64,
    seed: u64,
}

impl LimeTrust {
    pub const DEFAULT_SAMPLES: usize = 100;

    /// # Arguments
    ///
    /// * `train` - Training split; its column spread calibrates the perturbations
    /// * `num_samples` - Perturbed samples per instance, the instance itself included
    /// * `kernel_width` - Proximity kernel width, defaults to `0.75 * sqrt(n_features)`
    /// * `seed` - Seed for the perturbation streams
    pub fn new(
        train: &TrainingData,
        num_samples: usize,
        kernel_width: Option<f64>,
        seed: u64,
    ) -> Result<Self> {
        if num_samples < 2 {
            return Err(TrustError::Configuration(format!(
                "LIME needs at least 2 samples per instance, got {}",
                num_samples
            )));
        }
        check_norm(train.n_classes())?;
        if train.n_samples() == 0 {
            return Err(TrustError::Configuration(
                "LIME needs training rows to calibrate perturbations".to_string(),
            ));
        }
        let default_width = 0.75 * (train.n_features().max(1) as f64).sqrt();
        let kernel_width = kernel_width.unwrap_or(default_width);
        if !(kernel_width > 0.0 && kernel_width.is_finite()) {
            return Err(TrustError::Configuration(format!(
                "kernel width must be positive, got {}",
                kernel_width
            )));
        }
        Ok(LimeTrust {
            scaler: fit_scaler(&train.x),
            feature_names: train.feature_names.clone(),
            label_names: train.label_names.clone(),
            num_samples,
            kernel_width,
            seed,
        })
    }

    fn norm(&self) -> usize {
        self.label_names.len()
    }

    fn perturb(&self, instance: ArrayView1<f64>, rng: &mut StdRng) -> Result<Array2<f64>> {
        let normal = Normal::new(0.0, 1.0).map_err(|e| TrustError::Configuration(e.to_string()))?;
        let d = instance.len();
        let mut samples = Array2::zeros((self.num_samples, d));
        samples.row_mut(0).assign(&instance);
        for s in 1..self.num_samples {
            for c in 0..d {
                let noise = if self.scaler.is_constant(c) {
                    0.0
                } else {
                    self.scaler.std[c] * normal.sample(rng)
                };
                samples[(s, c)] = instance[c] + noise;
            }
        }
        Ok(samples)
    }

    /// Fit the local surrogate for one instance and `class`.
    fn surrogate(
        &self,
        row: usize,
        instance: ArrayView1<f64>,
        class: usize,
        classifier: &dyn ClassifierModel,
    ) -> Result<(f64, Vec<f64>, f64)> {
        let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, row as u64));
        let samples = self.perturb(instance, &mut rng)?;

        let probs = classifier.predict_prob(&samples)?;
        check_probabilities(&probs, self.num_samples, self.norm())?;
        let target: Vec<f64> = probs.column(class).to_vec();

        let design: Vec<Vec<f64>> = samples
            .rows()
            .into_iter()
            .map(|z| self.scaler.scaled_offset(z, instance))
            .collect();
        let weights: Vec<f64> = design
            .iter()
            .map(|offset| {
                let d2: f64 = offset.iter().map(|v| v * v).sum();
                (-d2 / (self.kernel_width * self.kernel_width)).exp().sqrt()
            })
            .collect();

        let (intercept, coef) = weighted_ridge(&design, &target, &weights, RIDGE_ALPHA)?;
        let fitted: Vec<f64> = design
            .iter()
            .map(|z| intercept + z.iter().zip(&coef).map(|(a, b)| a * b).sum::<f64>())
            .collect();

        // A locally constant output is explained perfectly
        let fidelity = weighted_r2(&target, &fitted, &weights)
            .map_or(1.0, |r2| r2.clamp(0.0, 1.0));
        Ok((intercept, coef, fidelity))
    }

    /// Explain the classifier's probability for `class` around `instance`.
    pub fn explain_instance(
        &self,
        instance: ArrayView1<f64>,
        class: usize,
        classifier: &dyn ClassifierModel,
    ) -> Result<LocalExplanation> {
        if instance.len() != self.scaler.n_features() {
            return Err(TrustError::DimensionMismatch {
                what: "instance width",
                expected: self.scaler.n_features(),
                found: instance.len(),
            });
        }
        let label = self.label_names.get(class).cloned().ok_or_else(|| {
            TrustError::Configuration(format!("class id {} out of range", class))
        })?;
        let (intercept, coef, fidelity) = self.surrogate(0, instance, class, classifier)?;
        Ok(LocalExplanation {
            label,
            intercept,
            weights: self.feature_names.iter().cloned().zip(coef).collect(),
            fidelity,
        })
    }
}

/// Weighted ridge regression with an unpenalized intercept.
///
/// Centers design and target by their weighted means, then solves
/// `(Xᵀ W X + αI) β = Xᵀ W y`.
fn weighted_ridge(
    design: &[Vec<f64>],
    target: &[f64],
    weights: &[f64],
    alpha: f64,
) -> Result<(f64, Vec<f64>)> {
    let d = design.first().map_or(0, |r| r.len());
    let w_sum: f64 = weights.iter().sum();
    if w_sum <= 0.0 {
        return Err(TrustError::Configuration(
            "all surrogate weights vanished, increase the kernel width".to_string(),
        ));
    }

    let y_mean = target.iter().zip(weights).map(|(y, w)| y * w).sum::<f64>() / w_sum;
    let mut x_mean = vec![0.0; d];
    for (row, w) in design.iter().zip(weights) {
        for (m, v) in x_mean.iter_mut().zip(row) {
            *m += w * v;
        }
    }
    x_mean.iter_mut().for_each(|m| *m /= w_sum);
    if d == 0 {
        return Ok((y_mean, Vec::new()));
    }

    let mut gram = DMatrix::<f64>::identity(d, d) * alpha;
    let mut rhs = DVector::<f64>::zeros(d);
    for ((row, &y), &w) in design.iter().zip(target).zip(weights) {
        let centered: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
        for i in 0..d {
            rhs[i] += w * centered[i] * (y - y_mean);
            for j in 0..d {
                gram[(i, j)] += w * centered[i] * centered[j];
            }
        }
    }

    let beta = match gram.clone().cholesky() {
        Some(chol) => chol.solve(&rhs),
        None => gram.lu().solve(&rhs).ok_or_else(|| {
            TrustError::Configuration("surrogate normal equations are singular".to_string())
        })?,
    };
    let coef: Vec<f64> = beta.iter().copied().collect();
    let intercept = y_mean - coef.iter().zip(&x_mean).map(|(b, m)| b * m).sum::<f64>();
    Ok((intercept, coef))
}

impl TrustStrategy for LimeTrust {
    fn trust_scores_with_budget(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        classifier: &dyn ClassifierModel,
        budget: &Budget,
    ) -> Result<TrustResult> {
        check_feature_width(x_test, self.scaler.n_features())?;
        check_probabilities(y_proba, x_test.nrows(), self.norm())?;
        let predicted = row_argmax(y_proba);

        let column = score_rows(x_test.nrows(), budget, |row| {
            let (_, coef, fidelity) = self.surrogate(row, x_test.row(row), predicted[row], classifier)?;
            if log::log_enabled!(log::Level::Trace) {
                let strongest = coef
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
                    .map(|(i, _)| self.feature_names[i].as_str())
                    .unwrap_or("-");
                log::trace!(
                    "LIME row {}: class '{}', fidelity {:.4}, strongest feature '{}'",
                    row,
                    self.label_names[predicted[row]],
                    fidelity,
                    strongest
                );
            }
            Ok(RowOutcome::Scored(fidelity))
        })?;
        Ok(TrustResult::Scores(column))
    }

    fn trust_strategy_name(&self) -> String {
        format!("LIME(samples={})", self.num_samples)
    }
}
