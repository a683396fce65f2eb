//! Data structures and helpers for labelled feature matrices.
//!
//! This module defines `TrainingData` and contains helpers for validating
//! labels, splitting a dataset into train and test parts, and drawing
//! bootstrap resamples used by the confidence interval calculator.
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{Result, TrustError};

/// A labelled feature matrix plus the names that go with it.
#[derive(Debug, Clone)]
pub struct TrainingData {
    /// Features, shape (n_samples, n_features)
    pub x: Array2<f64>,
    /// Dense class ids `0..K-1`, one per row of `x`
    pub y: Vec<usize>,
    /// Feature (column) names
    pub feature_names: Vec<String>,
    /// Class names, indexed by class id
    pub label_names: Vec<String>,
}

impl TrainingData {
    /// Build a dataset, checking that rows, labels and names line up.
    pub fn new(
        x: Array2<f64>,
        y: Vec<usize>,
        feature_names: Vec<String>,
        label_names: Vec<String>,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(TrustError::DimensionMismatch {
                what: "label vector length",
                expected: x.nrows(),
                found: y.len(),
            });
        }
        if feature_names.len() != x.ncols() {
            return Err(TrustError::DimensionMismatch {
                what: "feature name count",
                expected: x.ncols(),
                found: feature_names.len(),
            });
        }
        validate_labels(&y, label_names.len())?;
        Ok(TrainingData {
            x,
            y,
            feature_names,
            label_names,
        })
    }

    /// Dataset with generated names (`f0..`, `c0..`), handy for tests and
    /// programmatic use.
    pub fn unnamed(x: Array2<f64>, y: Vec<usize>) -> Result<Self> {
        let n_classes = y.iter().max().map_or(0, |&m| m + 1);
        let feature_names = (0..x.ncols()).map(|i| format!("f{}", i)).collect();
        let label_names = (0..n_classes).map(|i| format!("c{}", i)).collect();
        Self::new(x, y, feature_names, label_names)
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.label_names.len()
    }

    /// Subset of rows, in the given order. Indices may repeat.
    pub fn select(&self, indices: &[usize]) -> TrainingData {
        TrainingData {
            x: self.x.select(Axis(0), indices),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            feature_names: self.feature_names.clone(),
            label_names: self.label_names.clone(),
        }
    }

    pub fn log_summary(&self) {
        let mut counts = vec![0usize; self.n_classes()];
        for &label in &self.y {
            counts[label] += 1;
        }
        log::info!(
            "{} rows, {} features, {} classes",
            self.n_samples(),
            self.n_features(),
            self.n_classes()
        );
        for (name, count) in self.label_names.iter().zip(counts) {
            log::debug!("class '{}': {} rows", name, count);
        }
    }
}

/// Check that every label is a valid id for `n_classes` classes.
pub fn validate_labels(y: &[usize], n_classes: usize) -> Result<()> {
    if let Some(&bad) = y.iter().find(|&&label| label >= n_classes) {
        return Err(TrustError::Configuration(format!(
            "label id {} out of range for {} classes",
            bad, n_classes
        )));
    }
    Ok(())
}

/// Shuffle rows with a seeded RNG and split them into (train, test).
///
/// # Arguments
///
/// * `data` - The dataset to split
/// * `test_fraction` - Share of rows that go to the test part, in (0, 1)
/// * `seed` - RNG seed, the split is a pure function of it
///
/// # Returns
///
/// Both parts keep at least one row.
pub fn train_test_split(
    data: &TrainingData,
    test_fraction: f64,
    seed: u64,
) -> Result<(TrainingData, TrainingData)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrustError::Configuration(format!(
            "test_fraction must lie in (0, 1), got {}",
            test_fraction
        )));
    }
    let n = data.n_samples();
    if n < 2 {
        return Err(TrustError::Configuration(format!(
            "cannot split {} rows into train and test parts",
            n
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction).round() as usize;
    let n_test = n_test.clamp(1, n - 1);
    let (test_idx, train_idx) = indices.split_at(n_test);

    log::debug!(
        "Split {} rows into {} train and {} test rows",
        n,
        train_idx.len(),
        test_idx.len()
    );
    Ok((data.select(train_idx), data.select(test_idx)))
}

/// Draw `n` row indices with replacement, and the out-of-bag rows that were
/// never drawn (ascending).
pub fn bootstrap_indices<R: Rng>(n: usize, rng: &mut R) -> (Vec<usize>, Vec<usize>) {
    let mut drawn = vec![false; n];
    let in_bag: Vec<usize> = (0..n)
        .map(|_| {
            let i = rng.gen_range(0..n);
            drawn[i] = true;
            i
        })
        .collect();
    let out_of_bag = (0..n).filter(|&i| !drawn[i]).collect();
    (in_bag, out_of_bag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn toy(n: usize) -> TrainingData {
        let x = Array2::from_shape_fn((n, 2), |(r, c)| (r * 2 + c) as f64);
        let y = (0..n).map(|i| i % 2).collect();
        TrainingData::unnamed(x, y).unwrap()
    }

    #[test]
    fn new_rejects_mismatched_labels() {
        let x = Array2::zeros((3, 2));
        let err = TrainingData::unnamed(x, vec![0, 1]).unwrap_err();
        assert!(matches!(err, TrustError::DimensionMismatch { .. }));
    }

    #[test]
    fn new_rejects_out_of_range_label() {
        let x = Array2::zeros((2, 1));
        let err = TrainingData::new(
            x,
            vec![0, 2],
            vec!["a".into()],
            vec!["n".into(), "m".into()],
        )
        .unwrap_err();
        assert!(matches!(err, TrustError::Configuration(_)));
    }

    #[test]
    fn split_is_seeded_and_partitions_rows() {
        let data = toy(20);
        let (tr1, te1) = train_test_split(&data, 0.25, 11).unwrap();
        let (tr2, te2) = train_test_split(&data, 0.25, 11).unwrap();
        assert_eq!(te1.n_samples(), 5);
        assert_eq!(tr1.n_samples(), 15);
        assert_eq!(te1.x, te2.x);
        assert_eq!(tr1.y, tr2.y);

        let mut firsts: Vec<f64> = tr1.x.column(0).iter().chain(te1.x.column(0).iter()).copied().collect();
        firsts.sort_by(|a, b| a.total_cmp(b));
        let expected: Vec<f64> = (0..20).map(|r| (r * 2) as f64).collect();
        assert_eq!(firsts, expected);
    }

    #[test]
    fn split_keeps_one_row_each_side() {
        let (tr, te) = train_test_split(&toy(2), 0.01, 0).unwrap();
        assert_eq!((tr.n_samples(), te.n_samples()), (1, 1));
        assert!(train_test_split(&toy(5), 1.0, 0).is_err());
    }

    #[test]
    fn bootstrap_out_of_bag_is_disjoint_from_draws() {
        let mut rng = StdRng::seed_from_u64(3);
        let (in_bag, oob) = bootstrap_indices(50, &mut rng);
        assert_eq!(in_bag.len(), 50);
        for i in &oob {
            assert!(!in_bag.contains(i));
        }
    }
}
