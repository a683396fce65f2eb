use std::collections::BTreeMap;

use ndarray::Array2;
use rayon::prelude::*;

use crate::budget::Budget;
use crate::calculators::{
    check_feature_width, check_norm, check_probabilities, delegate_confidence, fit_delegate,
    ScoreColumn, TrustResult, TrustStrategy,
};
use crate::data_handling::TrainingData;
use crate::error::{Result, TrustError};
use crate::models::classifier_trait::ClassifierModel;
use crate::stats::{row_argmax, select_per_row};

/// The primary confidence next to the confidence of every delegate, one
/// column each. No aggregation is applied.
pub struct MultiCombinedTrust {
    delegates: Vec<(String, Box<dyn ClassifierModel>)>,
    n_features: usize,
    norm: usize,
}

impl MultiCombinedTrust {
    /// Fit each delegate independently on `train`.
    ///
    /// Delegates are keyed by `name()`; a name that is already taken gets a
    /// `#<n>` suffix, starting at its position and counting up until free.
    pub fn new(delegates: Vec<Box<dyn ClassifierModel>>, train: &TrainingData, norm: usize) -> Result<Self> {
        check_norm(norm)?;
        if delegates.is_empty() {
            return Err(TrustError::Configuration(
                "MultiCombined needs at least one delegate".to_string(),
            ));
        }

        let fitted: Vec<Box<dyn ClassifierModel>> = delegates
            .into_par_iter()
            .map(|mut delegate| -> Result<Box<dyn ClassifierModel>> {
                fit_delegate(delegate.as_mut(), train, norm)?;
                Ok(delegate)
            })
            .collect::<Result<_>>()?;

        let mut keyed: Vec<(String, Box<dyn ClassifierModel>)> = Vec::with_capacity(fitted.len());
        for (position, delegate) in fitted.into_iter().enumerate() {
            let base = delegate.name();
            let mut key = base.clone();
            let mut suffix = position;
            while key == "primary" || keyed.iter().any(|(k, _)| *k == key) {
                key = format!("{}#{}", base, suffix);
                suffix += 1;
            }
            keyed.push((key, delegate));
        }

        Ok(MultiCombinedTrust {
            delegates: keyed,
            n_features: train.n_features(),
            norm,
        })
    }

    /// Result keys of the delegates, in construction order.
    pub fn delegate_keys(&self) -> Vec<&str> {
        self.delegates.iter().map(|(k, _)| k.as_str()).collect()
    }
}

impl TrustStrategy for MultiCombinedTrust {
    fn trust_scores_with_budget(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        _classifier: &dyn ClassifierModel,
        _budget: &Budget,
    ) -> Result<TrustResult> {
        check_feature_width(x_test, self.n_features)?;
        check_probabilities(y_proba, x_test.nrows(), self.norm)?;
        let predicted = row_argmax(y_proba);

        let mut map: BTreeMap<String, ScoreColumn> = BTreeMap::new();
        map.insert(
            "primary".to_string(),
            select_per_row(y_proba, &predicted).into_iter().map(Some).collect(),
        );
        for (key, delegate) in &self.delegates {
            let scores = delegate_confidence(delegate.as_ref(), x_test, &predicted, self.norm)?;
            map.insert(key.clone(), scores.into_iter().map(Some).collect());
        }
        Ok(TrustResult::Named(map))
    }

    fn trust_strategy_name(&self) -> String {
        "MultiCombined".to_string()
    }
}
