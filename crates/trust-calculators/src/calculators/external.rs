use ndarray::Array2;

use crate::budget::Budget;
use crate::calculators::{
    check_feature_width, check_norm, check_probabilities, delegate_confidence, fit_delegate,
    TrustResult, TrustStrategy,
};
use crate::data_handling::TrainingData;
use crate::error::Result;
use crate::models::classifier_trait::ClassifierModel;
use crate::stats::row_argmax;

/// Second opinion from an independent classifier: the probability the
/// delegate assigns to the primary's predicted class.
pub struct ExternalTrust {
    delegate: Box<dyn ClassifierModel>,
    n_features: usize,
    norm: usize,
}

impl ExternalTrust {
    /// Takes ownership of an unfitted delegate and fits it on `train`.
    pub fn new(mut delegate: Box<dyn ClassifierModel>, train: &TrainingData, norm: usize) -> Result<Self> {
        check_norm(norm)?;
        fit_delegate(delegate.as_mut(), train, norm)?;
        Ok(ExternalTrust {
            delegate,
            n_features: train.n_features(),
            norm,
        })
    }

    pub fn delegate(&self) -> &dyn ClassifierModel {
        self.delegate.as_ref()
    }
}

impl TrustStrategy for ExternalTrust {
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
        let scores = delegate_confidence(self.delegate.as_ref(), x_test, &predicted, self.norm)?;
        Ok(TrustResult::from_values(scores))
    }

    fn trust_strategy_name(&self) -> String {
        format!("External({})", self.delegate.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrustError;
    use crate::models::naive_bayes::NaiveBayesClassifier;
    use crate::stats::select_per_row;
    use ndarray::array;

    fn blobs() -> TrainingData {
        let x = array![[0.0, 0.1], [0.2, 0.0], [0.1, 0.3], [5.0, 5.1], [5.2, 4.9], [4.8, 5.0]];
        TrainingData::unnamed(x, vec![0, 0, 0, 1, 1, 1]).unwrap()
    }

    #[test]
    fn identical_delegate_echoes_primary_confidence() {
        let train = blobs();
        let mut primary = NaiveBayesClassifier::default();
        primary.fit(&train.x, &train.y).unwrap();
        let calc = ExternalTrust::new(Box::new(NaiveBayesClassifier::default()), &train, 2).unwrap();

        let x_test = array![[0.1, 0.1], [5.0, 5.0], [2.4, 2.6]];
        let y_proba = primary.predict_prob(&x_test).unwrap();
        let result = calc.trust_scores(&x_test, &y_proba, &primary).unwrap();
        let expected = select_per_row(&y_proba, &row_argmax(&y_proba));
        for (got, want) in result.scores().unwrap().iter().zip(expected) {
            assert!((got.unwrap() - want).abs() < 1e-12);
        }
        assert_eq!(calc.trust_strategy_name(), "External(NaiveBayes)");
    }

    #[test]
    fn narrow_delegate_output_is_a_dimension_mismatch() {
        let train = blobs();
        let calc = ExternalTrust::new(Box::new(NaiveBayesClassifier::default()), &train, 3);
        // labels 0/1 fit, but the delegate reports two columns for three classes
        let calc = calc.unwrap();
        let x_test = array![[0.0, 0.0]];
        let err = calc
            .trust_scores(&x_test, &array![[0.2, 0.3, 0.5]], &NaiveBayesClassifier::default())
            .unwrap_err();
        assert!(matches!(err, TrustError::DimensionMismatch { .. }));
    }
}
