use ndarray::Array2;
use rayon::prelude::*;

use crate::error::ClassifierError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_training_input, check_width, resolve_n_classes};
use crate::neighbors::KdTree;

/// k-nearest-neighbours classifier with uniform votes.
pub struct KNeighborsClassifier {
    k: usize,
    fixed_classes: Option<usize>,
    tree: Option<KdTree>,
    labels: Vec<usize>,
    n_classes: usize,
}

impl KNeighborsClassifier {
    pub fn new(k: usize) -> Self {
        KNeighborsClassifier {
            k,
            fixed_classes: None,
            tree: None,
            labels: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.fixed_classes = Some(n_classes);
        self
    }
}

impl ClassifierModel for KNeighborsClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError> {
        check_training_input(&self.name(), x, y)?;
        if self.k == 0 {
            return Err(ClassifierError::Training {
                model: self.name(),
                message: "k must be at least 1".to_string(),
            });
        }
        self.n_classes = resolve_n_classes(self.fixed_classes, y);
        self.labels = y.to_vec();
        self.tree = Some(KdTree::new(x.clone()));
        Ok(())
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let tree = self
            .tree
            .as_ref()
            .ok_or_else(|| ClassifierError::NotFitted(self.name()))?;
        check_width(&self.name(), tree.dim(), x.ncols())?;

        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|r| {
                let neighbors = tree.nearest(x.row(r), self.k);
                let mut votes = vec![0.0; self.n_classes];
                for n in &neighbors {
                    votes[self.labels[n.index]] += 1.0;
                }
                let total = neighbors.len() as f64;
                votes.iter_mut().for_each(|v| *v /= total);
                votes
            })
            .collect();

        let mut probs = Array2::zeros((x.nrows(), self.n_classes));
        for (r, votes) in rows.into_iter().enumerate() {
            for (c, v) in votes.into_iter().enumerate() {
                probs[(r, c)] = v;
            }
        }
        Ok(probs)
    }

    fn n_classes(&self) -> Option<usize> {
        self.tree.as_ref().map(|_| self.n_classes)
    }

    fn name(&self) -> String {
        format!("{}NearestNeighbors", self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn votes_are_fractions_of_k() {
        let x = array![[0.0], [0.1], [0.2], [5.0], [5.1]];
        let y = vec![0, 0, 1, 1, 1];
        let mut knn = KNeighborsClassifier::new(3);
        knn.fit(&x, &y).unwrap();

        let probs = knn.predict_prob(&array![[0.05], [5.05]]).unwrap();
        assert!((probs[(0, 0)] - 2.0 / 3.0).abs() < 1e-12);
        assert!((probs[(1, 1)] - 1.0).abs() < 1e-12);
        assert_eq!(knn.name(), "3NearestNeighbors");
    }

    #[test]
    fn k_zero_is_a_training_error() {
        let mut knn = KNeighborsClassifier::new(0);
        let err = knn.fit(&array![[0.0]], &[0]).unwrap_err();
        assert!(matches!(err, ClassifierError::Training { .. }));
    }
}
