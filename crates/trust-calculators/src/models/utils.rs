use ndarray::{Array2, Axis};

use crate::error::ClassifierError;

/// Shared checks for `fit` inputs.
pub(crate) fn check_training_input(
    model: &str,
    x: &Array2<f64>,
    y: &[usize],
) -> Result<(), ClassifierError> {
    if x.nrows() == 0 {
        return Err(ClassifierError::Training {
            model: model.to_string(),
            message: "empty training set".to_string(),
        });
    }
    if x.nrows() != y.len() {
        return Err(ClassifierError::Training {
            model: model.to_string(),
            message: format!("{} rows but {} labels", x.nrows(), y.len()),
        });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(ClassifierError::Training {
            model: model.to_string(),
            message: "features contain NaN or infinite values".to_string(),
        });
    }
    Ok(())
}

/// Number of classes implied by the labels unless fixed up front.
pub(crate) fn resolve_n_classes(fixed: Option<usize>, y: &[usize]) -> usize {
    let observed = y.iter().max().map_or(0, |&m| m + 1);
    fixed.map_or(observed, |k| k.max(observed))
}

pub(crate) fn check_width(model: &str, expected: usize, found: usize) -> Result<(), ClassifierError> {
    if expected != found {
        return Err(ClassifierError::DimensionMismatch {
            model: model.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Rescale each row to sum to 1. All-zero rows become uniform.
pub(crate) fn normalize_rows(probs: &mut Array2<f64>) {
    let k = probs.ncols();
    for mut row in probs.axis_iter_mut(Axis(0)) {
        let total: f64 = row.sum();
        if total > 0.0 && total.is_finite() {
            row.mapv_inplace(|v| v / total);
        } else if k > 0 {
            row.fill(1.0 / k as f64);
        }
    }
}

/// Row-wise softmax of log-scores, computed stably via log-sum-exp.
pub(crate) fn softmax_rows(log_scores: &mut Array2<f64>) {
    for mut row in log_scores.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            let k = row.len() as f64;
            row.fill(1.0 / k);
            continue;
        }
        row.mapv_inplace(|v| (v - max).exp());
        let total: f64 = row.sum();
        row.mapv_inplace(|v| v / total);
    }
}
