use ndarray::Array2;
use rayon::prelude::*;

use crate::budget::Budget;
use crate::calculators::{
    check_feature_width, check_norm, check_probabilities, TrustResult, TrustStrategy,
};
use crate::data_handling::{validate_labels, TrainingData};
use crate::error::{Result, TrustError};
use crate::models::classifier_trait::ClassifierModel;
use crate::neighbors::KdTree;
use crate::stats::row_argmax;

/// Local label consistency: the share of the `k` nearest training rows whose
/// label matches the predicted class.
pub struct NeighborsTrust {
    tree: KdTree,
    labels: Vec<usize>,
    k: usize,
    norm: usize,
}

impl NeighborsTrust {
    pub const DEFAULT_K: usize = 19;

    /// Index the training rows. `norm` is the size of the label set.
    pub fn new(train: &TrainingData, k: usize, norm: usize) -> Result<Self> {
        if k == 0 {
            return Err(TrustError::Configuration("k must be at least 1".to_string()));
        }
        check_norm(norm)?;
        validate_labels(&train.y, norm)?;
        if train.n_samples() == 0 {
            return Err(TrustError::Configuration(
                "neighbour trust needs at least one training row".to_string(),
            ));
        }
        if train.n_samples() < k {
            log::warn!(
                "Only {} training rows for k = {}, every query uses all of them",
                train.n_samples(),
                k
            );
        }
        Ok(NeighborsTrust {
            tree: KdTree::new(train.x.clone()),
            labels: train.y.clone(),
            k,
            norm,
        })
    }
}

impl TrustStrategy for NeighborsTrust {
    fn trust_scores_with_budget(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        _classifier: &dyn ClassifierModel,
        _budget: &Budget,
    ) -> Result<TrustResult> {
        check_feature_width(x_test, self.tree.dim())?;
        check_probabilities(y_proba, x_test.nrows(), self.norm)?;
        let predicted = row_argmax(y_proba);

        let scores: Vec<f64> = (0..x_test.nrows())
            .into_par_iter()
            .map(|row| {
                let neighbors = self.tree.nearest(x_test.row(row), self.k);
                let agreeing = neighbors
                    .iter()
                    .filter(|n| self.labels[n.index] == predicted[row])
                    .count();
                agreeing as f64 / neighbors.len() as f64
            })
            .collect();
        Ok(TrustResult::from_values(scores))
    }

    fn trust_strategy_name(&self) -> String {
        format!("Neighbors(k={})", self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::naive_bayes::NaiveBayesClassifier;
    use ndarray::array;

    fn line_data() -> TrainingData {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0], [12.0]];
        TrainingData::unnamed(x, vec![0, 0, 1, 1, 1, 1]).unwrap()
    }

    #[test]
    fn counts_agreeing_neighbours() {
        let calc = NeighborsTrust::new(&line_data(), 3, 2).unwrap();
        let x_test = array![[0.5], [11.0]];
        let y_proba = array![[0.9, 0.1], [0.9, 0.1]];
        let result = calc
            .trust_scores(&x_test, &y_proba, &NaiveBayesClassifier::default())
            .unwrap();
        let scores = result.scores().unwrap();
        assert!((scores[0].unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(scores[1], Some(0.0));
    }

    #[test]
    fn rejects_wrong_feature_width() {
        let calc = NeighborsTrust::new(&line_data(), 3, 2).unwrap();
        let err = calc
            .trust_scores(&array![[0.0, 1.0]], &array![[1.0, 0.0]], &NaiveBayesClassifier::default())
            .unwrap_err();
        assert!(matches!(err, TrustError::DimensionMismatch { .. }));
    }

    #[test]
    fn zero_k_is_a_configuration_error() {
        assert!(matches!(
            NeighborsTrust::new(&line_data(), 0, 2),
            Err(TrustError::Configuration(_))
        ));
    }
}
