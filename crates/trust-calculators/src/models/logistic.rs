use linfa::traits::Fit;
use linfa::Dataset;
use linfa_logistic::{MultiFittedLogisticRegression, MultiLogisticRegression};
use ndarray::{Array1, Array2};

use crate::error::ClassifierError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_training_input, check_width, resolve_n_classes};

const NAME: &str = "LogisticRegression";

enum Fitted {
    /// Fitted model and the sorted class ids it saw, one per probability column
    Multinomial(MultiFittedLogisticRegression<f64, usize>, Vec<usize>),
    /// Training labels held a single class.
    Single(usize),
}

/// Multinomial logistic regression backed by `linfa-logistic`.
pub struct LogisticRegressionClassifier {
    max_iterations: u64,
    alpha: f64,
    fixed_classes: Option<usize>,
    fitted: Option<Fitted>,
    n_classes: usize,
    n_features: usize,
}

impl LogisticRegressionClassifier {
    pub fn new(max_iterations: u64, alpha: f64) -> Self {
        LogisticRegressionClassifier {
            max_iterations,
            alpha,
            fixed_classes: None,
            fitted: None,
            n_classes: 0,
            n_features: 0,
        }
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.fixed_classes = Some(n_classes);
        self
    }
}

impl ClassifierModel for LogisticRegressionClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError> {
        check_training_input(NAME, x, y)?;
        self.n_classes = resolve_n_classes(self.fixed_classes, y);
        self.n_features = x.ncols();

        let first = y[0];
        if y.iter().all(|&label| label == first) {
            self.fitted = Some(Fitted::Single(first));
            return Ok(());
        }

        let mut seen = y.to_vec();
        seen.sort_unstable();
        seen.dedup();

        let dataset = Dataset::new(x.clone(), Array1::from(y.to_vec()));
        let model = MultiLogisticRegression::<f64>::default()
            .alpha(self.alpha)
            .max_iterations(self.max_iterations)
            .fit(&dataset)
            .map_err(|e| ClassifierError::Training {
                model: NAME.to_string(),
                message: e.to_string(),
            })?;
        self.fitted = Some(Fitted::Multinomial(model, seen));
        Ok(())
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| ClassifierError::NotFitted(NAME.to_string()))?;
        check_width(NAME, self.n_features, x.ncols())?;

        let mut probs = Array2::zeros((x.nrows(), self.n_classes));
        match fitted {
            Fitted::Single(class) => probs.column_mut(*class).fill(1.0),
            Fitted::Multinomial(model, seen) => {
                // linfa orders columns by the sorted classes it saw during fit
                let raw = model.predict_probabilities(x);
                for (j, &class) in seen.iter().enumerate() {
                    probs.column_mut(class).assign(&raw.column(j));
                }
            }
        }
        Ok(probs)
    }

    fn n_classes(&self) -> Option<usize> {
        self.fitted.as_ref().map(|_| self.n_classes)
    }

    fn name(&self) -> String {
        NAME.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn logistic_separates_classes() {
        let x = array![[0.0], [0.5], [1.0], [4.0], [4.5], [5.0], [9.0], [9.5], [10.0]];
        let y = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let mut lr = LogisticRegressionClassifier::new(200, 0.01).with_classes(4);
        lr.fit(&x, &y).unwrap();
        let probs = lr.predict_prob(&x).unwrap();
        assert_eq!(probs.ncols(), 4);
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert_eq!(lr.predict_class(&array![[0.0], [10.0]]).unwrap(), vec![0, 2]);
    }
}
