//! Trust calculators: strategies that attach a trust score to every
//! prediction of a fitted classifier.
//!
//! Every strategy implements [`TrustStrategy`]. The driver holds them as the
//! closed [`TrustCalculator`] enum, so a run iterates a fixed set of variants
//! and never inspects concrete types.
//!
//! The predicted class of a test row is always the arg-max of its row in
//! `y_proba`, with ties going to the lowest class id.
use std::collections::BTreeMap;

use ndarray::Array2;
use rayon::prelude::*;

use crate::budget::Budget;
use crate::data_handling::{validate_labels, TrainingData};
use crate::error::{Result, TrustError};
use crate::models::classifier_trait::ClassifierModel;
use crate::stats::select_per_row;

pub mod combined;
pub mod confidence_interval;
pub mod entropy;
pub mod external;
pub mod factory;
pub mod lime;
pub mod multi_combined;
pub mod neighbors;
pub mod shap;

pub use combined::CombinedTrust;
pub use confidence_interval::ConfidenceInterval;
pub use entropy::EntropyTrust;
pub use external::ExternalTrust;
pub use factory::{build_calculator, build_calculators};
pub use lime::LimeTrust;
pub use multi_combined::MultiCombinedTrust;
pub use neighbors::NeighborsTrust;
pub use shap::SHAPTrust;

/// One score per test row, in test row order. `None` marks a row that
/// deliberately received no score.
pub type ScoreColumn = Vec<Option<f64>>;

/// Output of a trust calculator: one column, or several named columns.
#[derive(Debug, Clone, PartialEq)]
pub enum TrustResult {
    Scores(ScoreColumn),
    Named(BTreeMap<String, ScoreColumn>),
}

impl TrustResult {
    /// A fully populated single column.
    pub fn from_values(values: Vec<f64>) -> Self {
        TrustResult::Scores(values.into_iter().map(Some).collect())
    }

    /// The single column, if this is a scalar result.
    pub fn scores(&self) -> Option<&ScoreColumn> {
        match self {
            TrustResult::Scores(scores) => Some(scores),
            TrustResult::Named(_) => None,
        }
    }

    /// A named component, if this is a mapping result.
    pub fn component(&self, key: &str) -> Option<&ScoreColumn> {
        match self {
            TrustResult::Scores(_) => None,
            TrustResult::Named(map) => map.get(key),
        }
    }

    /// True when every column has exactly `n_rows` entries.
    pub fn has_rows(&self, n_rows: usize) -> bool {
        match self {
            TrustResult::Scores(scores) => scores.len() == n_rows,
            TrustResult::Named(map) => map.values().all(|c| c.len() == n_rows),
        }
    }

    /// Flatten into output columns: a scalar result is named after the
    /// strategy, mapping entries become `"<strategy>_<key>"`.
    pub fn into_columns(self, strategy_name: &str) -> Vec<(String, ScoreColumn)> {
        match self {
            TrustResult::Scores(scores) => vec![(strategy_name.to_string(), scores)],
            TrustResult::Named(map) => map
                .into_iter()
                .map(|(key, column)| (format!("{}_{}", strategy_name, key), column))
                .collect(),
        }
    }
}

/// The common contract of all trust strategies.
pub trait TrustStrategy: Send + Sync {
    /// Trust scores for `x_test` given the classifier's probabilities for it,
    /// stopping early once `budget` runs out.
    fn trust_scores_with_budget(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        classifier: &dyn ClassifierModel,
        budget: &Budget,
    ) -> Result<TrustResult>;

    fn trust_scores(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        classifier: &dyn ClassifierModel,
    ) -> Result<TrustResult> {
        self.trust_scores_with_budget(x_test, y_proba, classifier, &Budget::unbounded())
    }

    /// Stable, human readable name, used as output column prefix.
    fn trust_strategy_name(&self) -> String;
}

/// Closed set of trust strategies.
pub enum TrustCalculator {
    Entropy(EntropyTrust),
    Neighbors(NeighborsTrust),
    Lime(LimeTrust),
    Shap(SHAPTrust),
    External(ExternalTrust),
    Combined(CombinedTrust),
    MultiCombined(MultiCombinedTrust),
    ConfidenceInterval(ConfidenceInterval),
}

impl TrustStrategy for TrustCalculator {
    fn trust_scores_with_budget(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        classifier: &dyn ClassifierModel,
        budget: &Budget,
    ) -> Result<TrustResult> {
        match self {
            TrustCalculator::Entropy(c) => c.trust_scores_with_budget(x_test, y_proba, classifier, budget),
            TrustCalculator::Neighbors(c) => c.trust_scores_with_budget(x_test, y_proba, classifier, budget),
            TrustCalculator::Lime(c) => c.trust_scores_with_budget(x_test, y_proba, classifier, budget),
            TrustCalculator::Shap(c) => c.trust_scores_with_budget(x_test, y_proba, classifier, budget),
            TrustCalculator::External(c) => c.trust_scores_with_budget(x_test, y_proba, classifier, budget),
            TrustCalculator::Combined(c) => c.trust_scores_with_budget(x_test, y_proba, classifier, budget),
            TrustCalculator::MultiCombined(c) => {
                c.trust_scores_with_budget(x_test, y_proba, classifier, budget)
            }
            TrustCalculator::ConfidenceInterval(c) => {
                c.trust_scores_with_budget(x_test, y_proba, classifier, budget)
            }
        }
    }

    fn trust_strategy_name(&self) -> String {
        match self {
            TrustCalculator::Entropy(c) => c.trust_strategy_name(),
            TrustCalculator::Neighbors(c) => c.trust_strategy_name(),
            TrustCalculator::Lime(c) => c.trust_strategy_name(),
            TrustCalculator::Shap(c) => c.trust_strategy_name(),
            TrustCalculator::External(c) => c.trust_strategy_name(),
            TrustCalculator::Combined(c) => c.trust_strategy_name(),
            TrustCalculator::MultiCombined(c) => c.trust_strategy_name(),
            TrustCalculator::ConfidenceInterval(c) => c.trust_strategy_name(),
        }
    }
}

/// `y_proba` must have one row per test row and `norm` columns.
pub(crate) fn check_probabilities(y_proba: &Array2<f64>, n_rows: usize, norm: usize) -> Result<()> {
    if y_proba.nrows() != n_rows {
        return Err(TrustError::DimensionMismatch {
            what: "probability matrix rows",
            expected: n_rows,
            found: y_proba.nrows(),
        });
    }
    if y_proba.ncols() != norm {
        return Err(TrustError::DimensionMismatch {
            what: "probability matrix columns",
            expected: norm,
            found: y_proba.ncols(),
        });
    }
    Ok(())
}

pub(crate) fn check_feature_width(x_test: &Array2<f64>, n_features: usize) -> Result<()> {
    if x_test.ncols() != n_features {
        return Err(TrustError::DimensionMismatch {
            what: "test feature width",
            expected: n_features,
            found: x_test.ncols(),
        });
    }
    Ok(())
}

pub(crate) fn check_norm(norm: usize) -> Result<()> {
    if norm < 2 {
        return Err(TrustError::Configuration(format!(
            "norm must count at least 2 classes, got {}",
            norm
        )));
    }
    Ok(())
}

/// Fit a delegate on the full training split and make sure it reports `norm`
/// probability columns.
pub(crate) fn fit_delegate(
    delegate: &mut dyn ClassifierModel,
    train: &TrainingData,
    norm: usize,
) -> Result<()> {
    validate_labels(&train.y, norm)?;
    delegate.fit(&train.x, &train.y)?;
    match delegate.n_classes() {
        Some(k) if k == norm => {}
        Some(k) if k > norm => {
            return Err(TrustError::DimensionMismatch {
                what: "delegate class count",
                expected: norm,
                found: k,
            })
        }
        // Narrower or unknown widths are checked again on every prediction.
        _ => {}
    }
    log::debug!(
        "Fitted delegate {} on {} training rows",
        delegate.name(),
        train.n_samples()
    );
    Ok(())
}

/// Probability the delegate assigns to `classes[i]` for row `i`.
pub(crate) fn delegate_confidence(
    delegate: &dyn ClassifierModel,
    x_test: &Array2<f64>,
    classes: &[usize],
    norm: usize,
) -> Result<Vec<f64>> {
    let probs = delegate.predict_prob(x_test)?;
    check_probabilities(&probs, x_test.nrows(), norm)?;
    Ok(select_per_row(&probs, classes))
}

/// Independent seed for stream `stream` (a row, a resample) of a seeded run,
/// so results do not depend on how rayon schedules the work.
pub(crate) fn derive_seed(seed: u64, stream: u64) -> u64 {
    // splitmix64 finalizer
    let mut z = seed
        .wrapping_add(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(stream.wrapping_mul(0xBF58_476D_1CE4_E5B9));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Per-row outcome of a budgeted scoring loop.
pub(crate) enum RowOutcome {
    Scored(f64),
    /// Row is outside the scored range on purpose.
    Unscored,
    /// Budget ran out before or while scoring this row.
    Interrupted,
}

/// Score rows in parallel, joined back in row order. Rows that see an
/// exhausted budget are skipped and the call ends in `ComputationTimeout`
/// carrying everything finished so far.
pub(crate) fn score_rows<F>(n_rows: usize, budget: &Budget, score_row: F) -> Result<ScoreColumn>
where
    F: Fn(usize) -> Result<RowOutcome> + Sync,
{
    let outcomes: Vec<Result<RowOutcome>> = (0..n_rows)
        .into_par_iter()
        .map(|row| {
            if budget.exhausted() {
                Ok(RowOutcome::Interrupted)
            } else {
                score_row(row)
            }
        })
        .collect();

    let mut column = Vec::with_capacity(n_rows);
    let mut interrupted = false;
    let mut completed = 0;
    for outcome in outcomes {
        match outcome? {
            RowOutcome::Scored(v) => {
                completed += 1;
                column.push(Some(v));
            }
            RowOutcome::Unscored => {
                completed += 1;
                column.push(None);
            }
            RowOutcome::Interrupted => {
                interrupted = true;
                column.push(None);
            }
        }
    }
    if interrupted {
        return Err(TrustError::ComputationTimeout {
            completed,
            total: n_rows,
            partial: column,
        });
    }
    Ok(column)
}
