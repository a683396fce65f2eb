use ndarray::{Array2, ArrayView1, Axis};
use ndarray_stats::QuantileExt;

/// Shannon entropy of a probability vector in nats.
///
/// Terms with `p == 0` contribute nothing, matching the `0 · ln 0 = 0`
/// convention.
pub fn shannon_entropy(p: ArrayView1<f64>) -> f64 {
    p.iter()
        .filter(|&&v| v > 0.0)
        .map(|&v| -v * v.ln())
        .sum()
}

/// Column index of the largest value in each row. Ties keep the first column.
///
/// Rows containing NaN resolve to column 0.
pub fn row_argmax(matrix: &Array2<f64>) -> Vec<usize> {
    matrix
        .axis_iter(Axis(0))
        .map(|row| row.argmax().unwrap_or(0))
        .collect()
}

/// Value of column `classes[i]` in row `i`.
pub fn select_per_row(matrix: &Array2<f64>, classes: &[usize]) -> Vec<f64> {
    classes
        .iter()
        .enumerate()
        .map(|(row, &class)| matrix[(row, class)])
        .collect()
}

/// Empirical percentile with linear interpolation between order statistics.
///
/// Uses the same definition as numpy's default (`linear`): the value at
/// fractional rank `q * (n - 1)` of the sorted sample.
///
/// # Arguments
///
/// * `sorted` - Sample sorted ascending.
/// * `q` - Quantile in `[0, 1]`.
///
/// # Returns
///
/// `None` when the sample is empty.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Two-sided percentile interval of a sample at `confidence_level`.
///
/// The sample is sorted in place.
pub fn percentile_interval(sample: &mut [f64], confidence_level: f64) -> Option<(f64, f64)> {
    sample.sort_unstable_by(|a, b| a.total_cmp(b));
    let alpha = 1.0 - confidence_level;
    let lower = percentile_sorted(sample, alpha / 2.0)?;
    let upper = percentile_sorted(sample, 1.0 - alpha / 2.0)?;
    Some((lower, upper))
}

/// Weighted coefficient of determination between `target` and `fitted`.
///
/// # Returns
///
/// `None` when the weighted variance of `target` is zero, i.e. there is
/// nothing left to explain.
pub fn weighted_r2(target: &[f64], fitted: &[f64], weights: &[f64]) -> Option<f64> {
    let w_sum: f64 = weights.iter().sum();
    if w_sum <= 0.0 {
        return None;
    }
    let mean = target
        .iter()
        .zip(weights)
        .map(|(t, w)| t * w)
        .sum::<f64>()
        / w_sum;
    let ss_tot: f64 = target
        .iter()
        .zip(weights)
        .map(|(t, w)| w * (t - mean).powi(2))
        .sum();
    if ss_tot <= f64::EPSILON * w_sum {
        return None;
    }
    let ss_res: f64 = target
        .iter()
        .zip(fitted)
        .zip(weights)
        .map(|((t, f), w)| w * (t - f).powi(2))
        .sum();
    Some(1.0 - ss_res / ss_tot)
}

/// Fraction of positions where `predicted` equals `truth`.
pub fn accuracy(predicted: &[usize], truth: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = predicted
        .iter()
        .zip(truth)
        .filter(|(p, t)| p == t)
        .count();
    hits as f64 / truth.len() as f64
}
