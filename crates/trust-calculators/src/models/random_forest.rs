use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::calculators::derive_seed;
use crate::error::ClassifierError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::FittedTree;
use crate::models::utils::{check_training_input, check_width, resolve_n_classes};

struct Member {
    tree: FittedTree,
    features: Vec<usize>,
}

/// Bagged `linfa-trees` decision trees, each grown on a bootstrap sample of
/// the rows and a random subset of `ceil(sqrt(d))` features. Probabilities
/// are the fraction of trees voting for each class.
pub struct RandomForestClassifier {
    n_trees: usize,
    max_depth: Option<usize>,
    seed: u64,
    fixed_classes: Option<usize>,
    members: Vec<Member>,
    n_classes: usize,
    n_features: Option<usize>,
}

impl RandomForestClassifier {
    pub fn new(n_trees: usize, max_depth: Option<usize>, seed: u64) -> Self {
        RandomForestClassifier {
            n_trees,
            max_depth,
            seed,
            fixed_classes: None,
            members: Vec::new(),
            n_classes: 0,
            n_features: None,
        }
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.fixed_classes = Some(n_classes);
        self
    }

    fn grow(&self, tree: usize, x: &Array2<f64>, y: &[usize]) -> Result<Member, ClassifierError> {
        let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, tree as u64));
        let n = x.nrows();
        let d = x.ncols();
        let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        let subset = ((d as f64).sqrt().ceil() as usize).clamp(1, d);
        let mut features = index::sample(&mut rng, d, subset).into_vec();
        features.sort_unstable();

        let sample_x = x.select(Axis(0), &rows).select(Axis(1), &features);
        let sample_y: Vec<usize> = rows.iter().map(|&r| y[r]).collect();
        let tree = FittedTree::fit(&self.name(), sample_x, &sample_y, self.max_depth)?;
        Ok(Member { tree, features })
    }
}

impl ClassifierModel for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError> {
        let name = self.name();
        check_training_input(&name, x, y)?;
        if self.n_trees == 0 {
            return Err(ClassifierError::Training {
                model: name,
                message: "a forest needs at least one tree".to_string(),
            });
        }
        let members = (0..self.n_trees)
            .into_par_iter()
            .map(|tree| self.grow(tree, x, y))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Grew {} trees on {} rows", members.len(), x.nrows());

        self.members = members;
        self.n_classes = resolve_n_classes(self.fixed_classes, y);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let n_features = self
            .n_features
            .ok_or_else(|| ClassifierError::NotFitted(self.name()))?;
        check_width(&self.name(), n_features, x.ncols())?;

        let mut votes = Array2::zeros((x.nrows(), self.n_classes));
        for member in &self.members {
            member.tree.vote(&x.select(Axis(1), &member.features), &mut votes);
        }
        votes /= self.members.len() as f64;
        Ok(votes)
    }

    fn n_classes(&self) -> Option<usize> {
        self.n_features.map(|_| self.n_classes)
    }

    fn name(&self) -> String {
        format!("RandomForest(trees={})", self.n_trees)
    }
}
