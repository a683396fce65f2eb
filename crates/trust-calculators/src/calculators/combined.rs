use std::collections::BTreeMap;

use ndarray::Array2;

use crate::budget::Budget;
use crate::calculators::{
    check_feature_width, check_norm, check_probabilities, delegate_confidence, fit_delegate,
    TrustResult, TrustStrategy,
};
use crate::config::FusionRule;
use crate::data_handling::TrainingData;
use crate::error::Result;
use crate::models::classifier_trait::ClassifierModel;
use crate::stats::{row_argmax, select_per_row};

/// Primary and delegate confidence side by side, plus their fusion.
///
/// Result keys: `primary`, `delegate` and `fused`.
pub struct CombinedTrust {
    delegate: Box<dyn ClassifierModel>,
    fusion: FusionRule,
    n_features: usize,
    norm: usize,
}

impl CombinedTrust {
    pub fn new(
        mut delegate: Box<dyn ClassifierModel>,
        train: &TrainingData,
        norm: usize,
        fusion: FusionRule,
    ) -> Result<Self> {
        check_norm(norm)?;
        fit_delegate(delegate.as_mut(), train, norm)?;
        Ok(CombinedTrust {
            delegate,
            fusion,
            n_features: train.n_features(),
            norm,
        })
    }
}

impl TrustStrategy for CombinedTrust {
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

        let primary = select_per_row(y_proba, &predicted);
        let delegate = delegate_confidence(self.delegate.as_ref(), x_test, &predicted, self.norm)?;
        let fused: Vec<f64> = primary
            .iter()
            .zip(&delegate)
            .map(|(&p, &d)| self.fusion.fuse(p, d))
            .collect();

        let mut map = BTreeMap::new();
        map.insert("primary".to_string(), primary.into_iter().map(Some).collect());
        map.insert("delegate".to_string(), delegate.into_iter().map(Some).collect());
        map.insert("fused".to_string(), fused.into_iter().map(Some).collect());
        Ok(TrustResult::Named(map))
    }

    fn trust_strategy_name(&self) -> String {
        format!("Combined({})", self.delegate.name())
    }
}
