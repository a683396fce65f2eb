#[cfg(feature = "linfa")]
pub mod decision_tree;
pub mod gbdt;
pub mod knn;
pub mod lda;
#[cfg(feature = "linfa")]
pub mod logistic;
pub mod naive_bayes;
#[cfg(feature = "linfa")]
pub mod random_forest;
#[cfg(feature = "linfa")]
pub mod svm;
pub(crate) mod utils;

pub mod classifier_trait;
pub mod factory;
