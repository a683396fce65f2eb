//! Bootstrap confidence interval of a reference model's accuracy.
//!
//! At construction the training split is resampled with replacement; each
//! resample fits a fresh reference model and is scored on its out-of-bag rows.
//! The percentile interval of those accuracies bounds how confident any
//! prediction may reasonably be, and the primary's confidence is clipped into
//! it.
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::budget::Budget;
use crate::calculators::{
    check_feature_width, check_norm, check_probabilities, derive_seed, TrustResult, TrustStrategy,
};
use crate::config::ModelConfig;
use crate::data_handling::{bootstrap_indices, TrainingData};
use crate::error::{Result, TrustError};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::build_model;
use crate::stats::{accuracy, percentile_interval, row_argmax, select_per_row};

#[derive(Debug, Clone)]
pub struct ConfidenceInterval {
    confidence_level: f64,
    n_resamples: usize,
    reference_name: String,
    lower: f64,
    upper: f64,
    n_features: usize,
    norm: usize,
}

impl ConfidenceInterval {
    pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.9999;

    /// Fewest resamples whose tails can resolve `confidence_level`,
    /// `ceil(1 / (1 - confidence_level))`.
    pub fn required_resamples(confidence_level: f64) -> usize {
        // 1 / (1 - 0.9) is 10.000000000000002 in floating point
        (1.0 / (1.0 - confidence_level) - 1e-6).ceil().max(1.0) as usize
    }

    /// Run the bootstrap without a time limit.
    pub fn new(
        train: &TrainingData,
        confidence_level: f64,
        n_resamples: Option<usize>,
        reference: ModelConfig,
        seed: u64,
    ) -> Result<Self> {
        Self::with_budget(
            train,
            confidence_level,
            n_resamples,
            reference,
            seed,
            &Budget::unbounded(),
        )
    }

    /// # Arguments
    ///
    /// * `train` - Training split to resample
    /// * `confidence_level` - Two-sided level in (0, 1)
    /// * `n_resamples` - Bootstrap resamples, defaults to the required minimum
    /// * `reference` - Model configuration fitted on every resample
    /// * `seed` - Seed for the resample streams
    /// * `budget` - Stops the bootstrap with `ComputationTimeout` when exhausted
    pub fn with_budget(
        train: &TrainingData,
        confidence_level: f64,
        n_resamples: Option<usize>,
        reference: ModelConfig,
        seed: u64,
        budget: &Budget,
    ) -> Result<Self> {
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(TrustError::Configuration(format!(
                "confidence level must lie in (0, 1), got {}",
                confidence_level
            )));
        }
        let required = Self::required_resamples(confidence_level);
        let n_resamples = n_resamples.unwrap_or(required);
        if n_resamples < required {
            return Err(TrustError::ResamplingInsufficient {
                confidence_level,
                requested: n_resamples,
                required,
            });
        }
        let norm = train.n_classes();
        check_norm(norm)?;
        if train.n_samples() == 0 {
            return Err(TrustError::Configuration(
                "cannot bootstrap an empty training set".to_string(),
            ));
        }

        let reference_name = build_model(reference.clone(), Some(norm)).name();
        log::info!(
            "Bootstrapping {} accuracy over {} resamples of {} rows",
            reference_name,
            n_resamples,
            train.n_samples()
        );

        let outcomes: Vec<Option<f64>> = (0..n_resamples)
            .into_par_iter()
            .map(|i| -> Result<Option<f64>> {
                if budget.exhausted() {
                    return Ok(None);
                }
                let mut rng = StdRng::seed_from_u64(derive_seed(seed, i as u64));
                let (in_bag, out_of_bag) = bootstrap_indices(train.n_samples(), &mut rng);
                let sample = train.select(&in_bag);

                let mut model = build_model(reference.clone(), Some(norm));
                model.fit(&sample.x, &sample.y)?;

                let held_out = if out_of_bag.is_empty() {
                    train.clone()
                } else {
                    train.select(&out_of_bag)
                };
                let predicted = model.predict_class(&held_out.x)?;
                Ok(Some(accuracy(&predicted, &held_out.y)))
            })
            .collect::<Result<_>>()?;

        let mut accuracies: Vec<f64> = outcomes.iter().flatten().copied().collect();
        if accuracies.len() < n_resamples {
            return Err(TrustError::ComputationTimeout {
                completed: accuracies.len(),
                total: n_resamples,
                partial: Vec::new(),
            });
        }
        let (lower, upper) = percentile_interval(&mut accuracies, confidence_level).ok_or_else(|| {
            TrustError::Configuration("no bootstrap accuracies were produced".to_string())
        })?;
        log::debug!(
            "{} accuracy interval at {}: [{:.4}, {:.4}]",
            reference_name,
            confidence_level,
            lower,
            upper
        );

        Ok(ConfidenceInterval {
            confidence_level,
            n_resamples,
            reference_name,
            lower,
            upper,
            n_features: train.n_features(),
            norm,
        })
    }

    /// Lower and upper bound of the accuracy interval.
    pub fn interval(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    pub fn n_resamples(&self) -> usize {
        self.n_resamples
    }
}

impl TrustStrategy for ConfidenceInterval {
    fn trust_scores_with_budget(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        _classifier: &dyn ClassifierModel,
        _budget: &Budget,
    ) -> Result<TrustResult> {
        check_feature_width(x_test, self.n_features)?;
        check_probabilities(y_proba, x_test.nrows(), self.norm)?;
        let confidence = select_per_row(y_proba, &row_argmax(y_proba));
        Ok(TrustResult::from_values(
            confidence
                .into_iter()
                .map(|p| p.clamp(self.lower, self.upper))
                .collect(),
        ))
    }

    fn trust_strategy_name(&self) -> String {
        format!(
            "ConfidenceInterval({}, {})",
            self.reference_name, self.confidence_level
        )
    }
}
