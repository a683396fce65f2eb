#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use trust_calculators::data_handling::TrainingData;
use trust_calculators::models::classifier_trait::ClassifierModel;
use trust_calculators::ClassifierError;

/// Answers the same probability row for every input.
pub struct ConstantClassifier {
    pub proba: Vec<f64>,
}

impl ConstantClassifier {
    pub fn new(proba: &[f64]) -> Self {
        ConstantClassifier {
            proba: proba.to_vec(),
        }
    }
}

impl ClassifierModel for ConstantClassifier {
    fn fit(&mut self, _x: &Array2<f64>, _y: &[usize]) -> Result<(), ClassifierError> {
        Ok(())
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        Ok(Array2::from_shape_fn((x.nrows(), self.proba.len()), |(_, c)| {
            self.proba[c]
        }))
    }

    fn n_classes(&self) -> Option<usize> {
        Some(self.proba.len())
    }

    fn name(&self) -> String {
        "Constant".to_string()
    }
}

/// Constant classifier that raises `flag` once it has answered `limit` calls.
pub struct CancellingClassifier {
    pub inner: ConstantClassifier,
    pub calls: AtomicUsize,
    pub limit: usize,
    pub flag: Arc<AtomicBool>,
}

impl CancellingClassifier {
    pub fn new(proba: &[f64], limit: usize, flag: Arc<AtomicBool>) -> Self {
        CancellingClassifier {
            inner: ConstantClassifier::new(proba),
            calls: AtomicUsize::new(0),
            limit,
            flag,
        }
    }
}

impl ClassifierModel for CancellingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError> {
        self.inner.fit(x, y)
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.limit {
            self.flag.store(true, Ordering::SeqCst);
        }
        self.inner.predict_prob(x)
    }

    fn n_classes(&self) -> Option<usize> {
        self.inner.n_classes()
    }

    fn name(&self) -> String {
        "Cancelling".to_string()
    }
}

/// Fails every call, standing in for a classifier that cannot be trained.
pub struct BrokenClassifier;

impl ClassifierModel for BrokenClassifier {
    fn fit(&mut self, _x: &Array2<f64>, _y: &[usize]) -> Result<(), ClassifierError> {
        Err(ClassifierError::Training {
            model: self.name(),
            message: "refusing to learn".to_string(),
        })
    }

    fn predict_prob(&self, _x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        Err(ClassifierError::NotFitted(self.name()))
    }

    fn n_classes(&self) -> Option<usize> {
        None
    }

    fn name(&self) -> String {
        "Broken".to_string()
    }
}

/// Two Gaussian blobs in two dimensions, class 1 shifted by `separation`.
pub fn two_blobs(n: usize, separation: f64, seed: u64) -> TrainingData {
    let mut rng = StdRng::seed_from_u64(seed);
    let y: Vec<usize> = (0..n).map(|i| i % 2).collect();
    let x = Array2::from_shape_fn((n, 2), |(r, _)| {
        let noise: f64 = rng.gen_range(-1.0..1.0);
        noise + y[r] as f64 * separation
    });
    TrainingData::unnamed(x, y).unwrap()
}
