use ndarray::Array2;

use crate::error::ClassifierError;
use crate::stats::row_argmax;

/// The capability set every classifier wrapper offers to the trust
/// calculators. Prediction takes `&self` so a fitted model can be queried
/// from several calculators and threads at once.
pub trait ClassifierModel: Send + Sync {
    /// Fit the model. `y` holds dense class ids, one per row of `x`.
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError>;

    /// Per-class probabilities, shape (n_rows, n_classes). Rows sum to 1.
    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError>;

    /// Most probable class per row.
    fn predict_class(&self, x: &Array2<f64>) -> Result<Vec<usize>, ClassifierError> {
        Ok(row_argmax(&self.predict_prob(x)?))
    }

    /// Width of the probability matrix, known once fitted.
    fn n_classes(&self) -> Option<usize>;

    /// Human readable name of the model
    fn name(&self) -> String;
}
