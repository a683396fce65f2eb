use linfa::prelude::*;
use linfa::Dataset;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2};

use crate::error::ClassifierError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_training_input, check_width, resolve_n_classes};

/// A fitted CART tree, or the single label it would always predict.
pub(crate) enum FittedTree {
    Tree(DecisionTree<f64, usize>),
    Leaf(usize),
}

impl FittedTree {
    pub(crate) fn fit(
        model: &str,
        x: Array2<f64>,
        y: &[usize],
        max_depth: Option<usize>,
    ) -> Result<Self, ClassifierError> {
        let first = y[0];
        if y.iter().all(|&label| label == first) {
            return Ok(FittedTree::Leaf(first));
        }
        let dataset = Dataset::new(x, Array1::from(y.to_vec()));
        let tree = DecisionTree::<f64, usize>::params()
            .max_depth(max_depth)
            .fit(&dataset)
            .map_err(|e| ClassifierError::Training {
                model: model.to_string(),
                message: e.to_string(),
            })?;
        Ok(FittedTree::Tree(tree))
    }

    /// Add one vote per row to the column of the predicted label.
    pub(crate) fn vote(&self, x: &Array2<f64>, votes: &mut Array2<f64>) {
        match self {
            FittedTree::Leaf(class) => votes.column_mut(*class).mapv_inplace(|v| v + 1.0),
            FittedTree::Tree(tree) => {
                let labels: Array1<usize> = tree.predict(x);
                for (row, &class) in labels.iter().enumerate() {
                    votes[(row, class)] += 1.0;
                }
            }
        }
    }
}

/// Single CART decision tree from `linfa-trees`. Probabilities are one-hot on
/// the predicted leaf label.
pub struct DecisionTreeClassifier {
    max_depth: usize,
    fixed_classes: Option<usize>,
    fitted: Option<FittedTree>,
    n_classes: usize,
    n_features: usize,
}

impl DecisionTreeClassifier {
    pub fn new(max_depth: usize) -> Self {
        DecisionTreeClassifier {
            max_depth,
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

impl ClassifierModel for DecisionTreeClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError> {
        let name = self.name();
        check_training_input(&name, x, y)?;
        self.n_classes = resolve_n_classes(self.fixed_classes, y);
        self.n_features = x.ncols();
        self.fitted = Some(FittedTree::fit(&name, x.clone(), y, Some(self.max_depth))?);
        Ok(())
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| ClassifierError::NotFitted(self.name()))?;
        check_width(&self.name(), self.n_features, x.ncols())?;

        let mut probs = Array2::zeros((x.nrows(), self.n_classes));
        fitted.vote(x, &mut probs);
        Ok(probs)
    }

    fn n_classes(&self) -> Option<usize> {
        self.fitted.as_ref().map(|_| self.n_classes)
    }

    fn name(&self) -> String {
        format!("DecisionTree(depth={})", self.max_depth)
    }
}
