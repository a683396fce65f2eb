//! trust-calculators: per-prediction trust scores for fitted classifiers.
//!
//! The crate provides classifier wrappers (GBDT, Gaussian naive Bayes,
//! k-nearest neighbours and, behind the `linfa` feature, logistic regression),
//! a family of trust calculators that attach a score in [0, 1] to every
//! prediction, and an evaluation driver that runs them side by side.
//!
//! Calculators are built once from a training split and then score any number
//! of test batches. Randomized calculators take an explicit seed, and long
//! running ones honour a [`budget::Budget`].
pub mod budget;
pub mod calculators;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod neighbors;
pub mod preprocessing;
pub mod stats;

pub use calculators::{ScoreColumn, TrustCalculator, TrustResult, TrustStrategy};
pub use error::{ClassifierError, ErrorKind, TrustError};
