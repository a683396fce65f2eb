//! Attribution-based trust from Monte-Carlo Shapley values.
//!
//! For every explained row the predicted-class probability is decomposed into
//! per-feature contributions relative to a background baseline. A prediction
//! is trusted when its attributions agree in sign and concentrate on a small
//! subset of features.
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;

use crate::budget::Budget;
use crate::calculators::{
    check_feature_width, check_norm, check_probabilities, derive_seed, score_rows, RowOutcome,
    TrustResult, TrustStrategy,
};
use crate::config::AttributionPolicy;
use crate::error::{Result, TrustError};
use crate::models::classifier_trait::ClassifierModel;
use crate::stats::row_argmax;

const EPS: f64 = 1e-12;

pub struct SHAPTrust {
    baseline: Array1<f64>,
    max_samples: usize,
    items: usize,
    reg: AttributionPolicy,
    seed: u64,
    norm: usize,
}

impl SHAPTrust {
    /// # Arguments
    ///
    /// * `background` - Rows summarizing the data distribution, the baseline is their column mean
    /// * `max_samples` - Background rows kept and permutations drawn per instance
    /// * `items` - Only the first `items` test rows are explained
    /// * `reg` - Policy picking the explaining subset of attributions
    /// * `seed` - Seed for background sampling and permutations
    /// * `norm` - Number of classes
    pub fn new(
        background: &Array2<f64>,
        max_samples: usize,
        items: usize,
        reg: AttributionPolicy,
        seed: u64,
        norm: usize,
    ) -> Result<Self> {
        check_norm(norm)?;
        if max_samples == 0 {
            return Err(TrustError::Configuration(
                "SHAP needs at least one sample".to_string(),
            ));
        }
        if let AttributionPolicy::TopK(0) = reg {
            return Err(TrustError::Configuration(
                "top-k attribution policy needs k >= 1".to_string(),
            ));
        }
        if background.nrows() == 0 {
            return Err(TrustError::Configuration(
                "SHAP needs at least one background row".to_string(),
            ));
        }

        let mean = if background.nrows() > max_samples {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut rows = index::sample(&mut rng, background.nrows(), max_samples).into_vec();
            rows.sort_unstable();
            background.select(Axis(0), &rows).mean_axis(Axis(0))
        } else {
            background.mean_axis(Axis(0))
        };
        let baseline =
            mean.ok_or_else(|| TrustError::Configuration("empty SHAP background".to_string()))?;

        log::debug!(
            "SHAP baseline from {} background rows over {} features",
            background.nrows().min(max_samples),
            baseline.len()
        );
        Ok(SHAPTrust {
            baseline,
            max_samples,
            items,
            reg,
            seed,
            norm,
        })
    }

    /// Permutation estimate of the Shapley values of `instance` for `class`.
    ///
    /// Returns `None` when the budget ran out mid-estimate.
    fn shapley_values(
        &self,
        row: usize,
        instance: ArrayView1<f64>,
        class: usize,
        classifier: &dyn ClassifierModel,
        budget: &Budget,
    ) -> Result<Option<Vec<f64>>> {
        let d = instance.len();
        let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, row as u64));
        let mut order: Vec<usize> = (0..d).collect();
        let mut phi = vec![0.0; d];

        for _ in 0..self.max_samples {
            if budget.exhausted() {
                return Ok(None);
            }
            order.shuffle(&mut rng);

            // Row j has the first j features of `order` switched to the instance.
            let mut path = Array2::zeros((d + 1, d));
            let mut current = self.baseline.clone();
            path.row_mut(0).assign(&current);
            for (j, &feature) in order.iter().enumerate() {
                current[feature] = instance[feature];
                path.row_mut(j + 1).assign(&current);
            }

            let probs = classifier.predict_prob(&path)?;
            check_probabilities(&probs, d + 1, self.norm)?;
            for (j, &feature) in order.iter().enumerate() {
                phi[feature] += probs[(j + 1, class)] - probs[(j, class)];
            }
        }

        let n = self.max_samples as f64;
        phi.iter_mut().for_each(|v| *v /= n);
        Ok(Some(phi))
    }
}

/// Number of leading (largest magnitude) attributions that explain the
/// prediction under `policy`. `sorted` holds magnitudes in descending order.
fn select_subset(sorted: &[f64], policy: AttributionPolicy) -> usize {
    let d = sorted.len();
    let penalty = |k: usize| match policy {
        AttributionPolicy::Aic => 2.0 * k as f64,
        _ => k as f64 * (d as f64).ln(),
    };
    match policy {
        AttributionPolicy::TopK(n) => n.clamp(1, d.max(1)),
        AttributionPolicy::Bic | AttributionPolicy::Aic => {
            let mut best = (1, f64::INFINITY);
            for k in 1..=(d.saturating_sub(1)).max(1) {
                let rss: f64 = sorted.iter().skip(k).map(|v| v * v).sum();
                let criterion = d as f64 * (rss / d as f64 + EPS).ln() + penalty(k);
                if criterion < best.1 {
                    best = (k, criterion);
                }
            }
            best.0
        }
    }
}

/// Trust of one attribution vector: sign consistency times concentration.
pub fn attribution_trust(phi: &[f64], policy: AttributionPolicy) -> f64 {
    let d = phi.len();
    let total_mass: f64 = phi.iter().map(|v| v.abs()).sum();
    if total_mass <= EPS {
        return 0.0;
    }
    let consistency = phi.iter().sum::<f64>().abs() / total_mass;

    let mut sorted: Vec<f64> = phi.iter().map(|v| v.abs()).collect();
    sorted.sort_unstable_by(|a, b| b.total_cmp(a));
    let k = select_subset(&sorted, policy);
    let selected_mass: f64 = sorted.iter().take(k).sum();
    let concentration = (selected_mass / total_mass) * (1.0 - (k as f64 - 1.0) / d as f64);

    (consistency * concentration).clamp(0.0, 1.0)
}

impl TrustStrategy for SHAPTrust {
    fn trust_scores_with_budget(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        classifier: &dyn ClassifierModel,
        budget: &Budget,
    ) -> Result<TrustResult> {
        check_feature_width(x_test, self.baseline.len())?;
        check_probabilities(y_proba, x_test.nrows(), self.norm)?;
        if x_test.nrows() > self.items {
            log::info!(
                "SHAP explains the first {} of {} rows, the rest stay unscored",
                self.items,
                x_test.nrows()
            );
        }
        let predicted = row_argmax(y_proba);

        let column = score_rows(x_test.nrows(), budget, |row| {
            if row >= self.items {
                return Ok(RowOutcome::Unscored);
            }
            match self.shapley_values(row, x_test.row(row), predicted[row], classifier, budget)? {
                Some(phi) => {
                    let trust = attribution_trust(&phi, self.reg);
                    log::trace!("SHAP row {}: phi {:?} -> {:.4}", row, phi, trust);
                    Ok(RowOutcome::Scored(trust))
                }
                None => Ok(RowOutcome::Interrupted),
            }
        })?;
        Ok(TrustResult::Scores(column))
    }

    fn trust_strategy_name(&self) -> String {
        format!("SHAP(reg={})", self.reg)
    }
}
