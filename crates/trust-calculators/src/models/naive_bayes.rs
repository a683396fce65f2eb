use ndarray::{Array2, Axis};
use statrs::distribution::{Continuous, Normal};

use crate::error::ClassifierError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_training_input, check_width, resolve_n_classes, softmax_rows};

const NAME: &str = "NaiveBayes";

struct ClassModel {
    log_prior: f64,
    features: Vec<Normal>,
}

/// Gaussian naive Bayes.
///
/// Every feature variance is inflated by `var_smoothing` times the largest
/// feature variance so constant columns stay usable. Classes without training
/// rows get probability 0.
pub struct NaiveBayesClassifier {
    var_smoothing: f64,
    fixed_classes: Option<usize>,
    classes: Vec<Option<ClassModel>>,
    n_features: Option<usize>,
}

impl NaiveBayesClassifier {
    pub fn new(var_smoothing: f64) -> Self {
        NaiveBayesClassifier {
            var_smoothing,
            fixed_classes: None,
            classes: Vec::new(),
            n_features: None,
        }
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.fixed_classes = Some(n_classes);
        self
    }
}

impl Default for NaiveBayesClassifier {
    fn default() -> Self {
        Self::new(1e-9)
    }
}

impl ClassifierModel for NaiveBayesClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError> {
        check_training_input(NAME, x, y)?;
        let n_classes = resolve_n_classes(self.fixed_classes, y);

        let max_var = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .copied()
            .fold(0.0f64, f64::max);
        let epsilon = (self.var_smoothing * max_var).max(1e-12);

        let mut classes = Vec::with_capacity(n_classes);
        for class in 0..n_classes {
            let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
            if rows.is_empty() {
                classes.push(None);
                continue;
            }
            let subset = x.select(Axis(0), &rows);
            let mean = subset.mean_axis(Axis(0)).ok_or_else(|| ClassifierError::Training {
                model: NAME.to_string(),
                message: format!("class {} has no rows", class),
            })?;
            let var = subset.var_axis(Axis(0), 0.0);

            let features = mean
                .iter()
                .zip(var.iter())
                .map(|(&m, &v)| {
                    Normal::new(m, (v + epsilon).sqrt()).map_err(|e| ClassifierError::Training {
                        model: NAME.to_string(),
                        message: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            classes.push(Some(ClassModel {
                log_prior: (rows.len() as f64 / y.len() as f64).ln(),
                features,
            }));
        }

        log::debug!(
            "Fitted Gaussian naive Bayes with {} classes on {} rows",
            n_classes,
            x.nrows()
        );
        self.classes = classes;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let n_features = self
            .n_features
            .ok_or_else(|| ClassifierError::NotFitted(NAME.to_string()))?;
        check_width(NAME, n_features, x.ncols())?;

        let mut log_joint = Array2::from_elem((x.nrows(), self.classes.len()), f64::NEG_INFINITY);
        for (r, row) in x.rows().into_iter().enumerate() {
            for (c, class) in self.classes.iter().enumerate() {
                if let Some(model) = class {
                    let ll: f64 = model
                        .features
                        .iter()
                        .zip(row.iter())
                        .map(|(dist, &v)| dist.ln_pdf(v))
                        .sum();
                    log_joint[(r, c)] = model.log_prior + ll;
                }
            }
        }
        softmax_rows(&mut log_joint);
        Ok(log_joint)
    }

    fn n_classes(&self) -> Option<usize> {
        self.n_features.map(|_| self.classes.len())
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
    fn separates_two_gaussian_blobs() {
        let x = array![
            [0.0, 0.1],
            [0.2, -0.1],
            [-0.1, 0.0],
            [5.0, 5.1],
            [5.2, 4.9],
            [4.9, 5.0]
        ];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut nb = NaiveBayesClassifier::default();
        nb.fit(&x, &y).unwrap();

        let probs = nb.predict_prob(&array![[0.0, 0.0], [5.0, 5.0]]).unwrap();
        assert!(probs[(0, 0)] > 0.99);
        assert!(probs[(1, 1)] > 0.99);
        assert_eq!(nb.predict_class(&x).unwrap(), y);
    }

    #[test]
    fn absent_class_gets_zero_probability() {
        let x = array![[0.0], [1.0], [0.5]];
        let mut nb = NaiveBayesClassifier::default().with_classes(3);
        nb.fit(&x, &[0, 2, 0]).unwrap();
        let probs = nb.predict_prob(&x).unwrap();
        assert_eq!(probs.ncols(), 3);
        assert!(probs.column(1).iter().all(|&p| p == 0.0));
    }

    #[test]
    fn rejects_wrong_width() {
        let mut nb = NaiveBayesClassifier::default();
        nb.fit(&array![[0.0, 1.0], [1.0, 0.0]], &[0, 1]).unwrap();
        let err = nb.predict_prob(&array![[0.0]]).unwrap_err();
        assert!(matches!(err, ClassifierError::DimensionMismatch { expected: 2, found: 1, .. }));
    }
}
