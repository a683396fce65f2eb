use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, Axis};

use crate::error::ClassifierError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_training_input, check_width, resolve_n_classes, softmax_rows};

const NAME: &str = "LDA";

/// Linear discriminant of one class: `score(x) = w . x + bias`.
struct Discriminant {
    weights: DVector<f64>,
    bias: f64,
}

/// Linear discriminant analysis with a pooled covariance matrix.
///
/// Classes without training rows get probability 0.
pub struct LdaClassifier {
    shrinkage: f64,
    fixed_classes: Option<usize>,
    discriminants: Vec<Option<Discriminant>>,
    n_features: Option<usize>,
}

impl LdaClassifier {
    pub fn new(shrinkage: f64) -> Self {
        LdaClassifier {
            shrinkage,
            fixed_classes: None,
            discriminants: Vec::new(),
            n_features: None,
        }
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.fixed_classes = Some(n_classes);
        self
    }

    fn training_error(message: impl Into<String>) -> ClassifierError {
        ClassifierError::Training {
            model: NAME.to_string(),
            message: message.into(),
        }
    }
}

impl Default for LdaClassifier {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ClassifierModel for LdaClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError> {
        check_training_input(NAME, x, y)?;
        if !(0.0..=1.0).contains(&self.shrinkage) {
            return Err(Self::training_error(format!(
                "shrinkage must lie in [0, 1], got {}",
                self.shrinkage
            )));
        }
        let n_classes = resolve_n_classes(self.fixed_classes, y);
        let d = x.ncols();

        let mut means: Vec<Option<(DVector<f64>, f64)>> = Vec::with_capacity(n_classes);
        let mut scatter = DMatrix::<f64>::zeros(d, d);
        let mut seen = 0;
        for class in 0..n_classes {
            let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
            if rows.is_empty() {
                means.push(None);
                continue;
            }
            seen += 1;
            let subset = x.select(Axis(0), &rows);
            let mean = subset
                .mean_axis(Axis(0))
                .ok_or_else(|| Self::training_error(format!("class {} has no rows", class)))?;
            let mean = DVector::from_iterator(d, mean.iter().copied());
            for row in subset.rows() {
                let centred = DVector::from_iterator(d, row.iter().copied()) - &mean;
                scatter += &centred * centred.transpose();
            }
            means.push(Some((mean, (rows.len() as f64 / y.len() as f64).ln())));
        }

        let dof = if y.len() > seen { y.len() - seen } else { y.len() };
        let mut covariance = scatter / dof as f64;
        let mean_variance = covariance.trace() / d as f64;
        if self.shrinkage > 0.0 {
            covariance = covariance * (1.0 - self.shrinkage)
                + DMatrix::identity(d, d) * (self.shrinkage * mean_variance);
        }
        // keep constant or collinear features invertible
        covariance += DMatrix::identity(d, d) * (1e-9 * mean_variance.max(1.0));

        let cholesky = covariance
            .cholesky()
            .ok_or_else(|| Self::training_error("pooled covariance is not positive definite"))?;
        self.discriminants = means
            .into_iter()
            .map(|entry| {
                entry.map(|(mean, log_prior)| {
                    let weights = cholesky.solve(&mean);
                    let bias = -0.5 * mean.dot(&weights) + log_prior;
                    Discriminant { weights, bias }
                })
            })
            .collect();

        log::debug!(
            "Fitted LDA with {} of {} classes on {} rows",
            seen,
            n_classes,
            x.nrows()
        );
        self.n_features = Some(d);
        Ok(())
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let n_features = self
            .n_features
            .ok_or_else(|| ClassifierError::NotFitted(NAME.to_string()))?;
        check_width(NAME, n_features, x.ncols())?;

        let mut scores = Array2::from_elem((x.nrows(), self.discriminants.len()), f64::NEG_INFINITY);
        for (r, row) in x.rows().into_iter().enumerate() {
            for (c, discriminant) in self.discriminants.iter().enumerate() {
                if let Some(disc) = discriminant {
                    let dot: f64 = disc.weights.iter().zip(row.iter()).map(|(w, v)| w * v).sum();
                    scores[(r, c)] = dot + disc.bias;
                }
            }
        }
        softmax_rows(&mut scores);
        Ok(scores)
    }

    fn n_classes(&self) -> Option<usize> {
        self.n_features.map(|_| self.discriminants.len())
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
    fn separates_shifted_blobs_with_shared_covariance() {
        let x = array![
            [0.0, 0.0],
            [1.0, 0.5],
            [0.5, 1.0],
            [3.0, 3.0],
            [4.0, 3.5],
            [3.5, 4.0]
        ];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut lda = LdaClassifier::default();
        lda.fit(&x, &y).unwrap();
        assert_eq!(lda.predict_class(&x).unwrap(), y);

        let probs = lda.predict_prob(&array![[2.0, 2.0]]).unwrap();
        // midpoint between the class means with equal priors
        assert!((probs[(0, 0)] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn constant_feature_does_not_break_the_fit() {
        let x = array![[0.0, 7.0], [0.2, 7.0], [2.0, 7.0], [2.2, 7.0]];
        let mut lda = LdaClassifier::default().with_classes(3);
        lda.fit(&x, &[0, 0, 1, 1]).unwrap();
        let probs = lda.predict_prob(&x).unwrap();
        assert_eq!(probs.ncols(), 3);
        assert!(probs.column(2).iter().all(|&p| p == 0.0));
        assert_eq!(lda.predict_class(&x).unwrap(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn shrinkage_outside_unit_interval_is_rejected() {
        let mut lda = LdaClassifier::new(1.5);
        let err = lda.fit(&array![[0.0], [1.0]], &[0, 1]).unwrap_err();
        assert!(matches!(err, ClassifierError::Training { .. }));
    }
}
