use ndarray::{Array2, Axis};

use crate::budget::Budget;
use crate::calculators::{check_norm, check_probabilities, TrustResult, TrustStrategy};
use crate::error::Result;
use crate::models::classifier_trait::ClassifierModel;
use crate::stats::shannon_entropy;

/// Trust from the shape of the probability vector alone:
/// `1 - H(p) / ln(K)`.
#[derive(Debug, Clone)]
pub struct EntropyTrust {
    norm: usize,
}

impl EntropyTrust {
    /// `norm` is the number of classes K, at least 2.
    pub fn new(norm: usize) -> Result<Self> {
        check_norm(norm)?;
        Ok(EntropyTrust { norm })
    }

    pub fn score(&self, y_proba: &Array2<f64>) -> Vec<f64> {
        let max_entropy = (self.norm as f64).ln();
        y_proba
            .axis_iter(Axis(0))
            .map(|p| {
                let trust = 1.0 - shannon_entropy(p) / max_entropy;
                // rounding noise around a uniform vector
                if trust < 1e-12 {
                    0.0
                } else {
                    trust.min(1.0)
                }
            })
            .collect()
    }
}

impl TrustStrategy for EntropyTrust {
    fn trust_scores_with_budget(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        _classifier: &dyn ClassifierModel,
        _budget: &Budget,
    ) -> Result<TrustResult> {
        check_probabilities(y_proba, x_test.nrows(), self.norm)?;
        Ok(TrustResult::from_values(self.score(y_proba)))
    }

    fn trust_strategy_name(&self) -> String {
        "Entropy".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrustError;
    use ndarray::array;

    #[test]
    fn one_hot_is_fully_trusted_and_uniform_is_not() {
        let calc = EntropyTrust::new(3).unwrap();
        let scores = calc.score(&array![[0.0, 1.0, 0.0], [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]]);
        assert_eq!(scores[0], 1.0);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn binary_point_nine() {
        let calc = EntropyTrust::new(2).unwrap();
        let s = calc.score(&array![[0.9, 0.1]])[0];
        assert!((s - 0.531).abs() < 5e-4, "got {}", s);
    }

    #[test]
    fn single_class_norm_is_rejected() {
        assert!(matches!(EntropyTrust::new(1), Err(TrustError::Configuration(_))));
    }
}
