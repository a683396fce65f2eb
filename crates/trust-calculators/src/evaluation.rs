//! Run a set of trust calculators against one classifier's predictions.
//!
//! Calculators run in parallel, each under its own budget. A failing
//! calculator is recorded and skipped; a timed-out one still contributes the
//! rows it finished. Calculators that could not be built are carried along in
//! a [`CalculatorSuite`] and show up in every report as failures.
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;

use crate::budget::Budget;
use crate::calculators::{ScoreColumn, TrustCalculator, TrustStrategy};
use crate::error::{ErrorKind, TrustError};
use crate::models::classifier_trait::ClassifierModel;

#[derive(Debug, Clone, Default)]
pub struct EvaluationOptions {
    /// Wall-clock limit per calculator
    pub timeout: Option<Duration>,
    /// Shared flag that stops every running calculator
    pub cancel: Option<Arc<AtomicBool>>,
}

impl EvaluationOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        EvaluationOptions {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    /// Fresh budget for one unit of work (building or running one calculator).
    pub fn budget(&self) -> Budget {
        let budget = match self.timeout {
            Some(timeout) => Budget::with_timeout(timeout),
            None => Budget::unbounded(),
        };
        match &self.cancel {
            Some(flag) => budget.with_cancel_flag(flag.clone()),
            None => budget,
        }
    }
}

/// A calculator that did not produce a complete result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatorFailure {
    pub strategy: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    /// Output columns in calculator order
    pub columns: Vec<(String, ScoreColumn)>,
    pub failures: Vec<CalculatorFailure>,
    /// Wall-clock time per calculator, in calculator order
    pub timings_ms: Vec<(String, u128)>,
}

impl EvaluationReport {
    pub fn column(&self, name: &str) -> Option<&ScoreColumn> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

/// Calculators that were built, plus the configurations that failed to build.
#[derive(Default)]
pub struct CalculatorSuite {
    pub calculators: Vec<TrustCalculator>,
    pub failures: Vec<CalculatorFailure>,
}

impl CalculatorSuite {
    /// Run the built calculators; construction failures lead the report's
    /// failure list.
    pub fn evaluate(
        &self,
        x_test: &Array2<f64>,
        y_proba: &Array2<f64>,
        classifier: &dyn ClassifierModel,
        options: &EvaluationOptions,
    ) -> EvaluationReport {
        let mut report = evaluate(&self.calculators, x_test, y_proba, classifier, options);
        let mut failures = self.failures.clone();
        failures.append(&mut report.failures);
        report.failures = failures;
        report
    }
}

impl CalculatorFailure {
    pub fn new(strategy: &str, err: &TrustError) -> Self {
        CalculatorFailure {
            strategy: strategy.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

struct Outcome {
    strategy: String,
    columns: Vec<(String, ScoreColumn)>,
    failure: Option<CalculatorFailure>,
    elapsed_ms: u128,
}

fn run_one(
    calculator: &TrustCalculator,
    x_test: &Array2<f64>,
    y_proba: &Array2<f64>,
    classifier: &dyn ClassifierModel,
    options: &EvaluationOptions,
) -> Outcome {
    let strategy = calculator.trust_strategy_name();
    let n_rows = x_test.nrows();
    let start = Instant::now();
    let result = calculator.trust_scores_with_budget(x_test, y_proba, classifier, &options.budget());
    let elapsed_ms = start.elapsed().as_millis();

    let failure = |err: &TrustError| CalculatorFailure::new(&strategy, err);

    let (columns, failure) = match result {
        Ok(result) if result.has_rows(n_rows) => (result.into_columns(&strategy), None),
        Ok(_) => {
            let err = TrustError::Configuration(format!(
                "{} returned a column whose length differs from {} test rows",
                strategy, n_rows
            ));
            (Vec::new(), Some(failure(&err)))
        }
        Err(err) => {
            let record = failure(&err);
            match err {
                TrustError::ComputationTimeout { partial, .. } if partial.len() == n_rows => {
                    (vec![(strategy.clone(), partial)], Some(record))
                }
                _ => (Vec::new(), Some(record)),
            }
        }
    };

    match &failure {
        Some(f) => log::warn!("{} failed after {} ms ({}): {}", strategy, elapsed_ms, f.kind, f.message),
        None => log::info!("{} finished in {} ms", strategy, elapsed_ms),
    }
    Outcome {
        strategy,
        columns,
        failure,
        elapsed_ms,
    }
}

/// Evaluate every calculator on the same test split.
///
/// # Arguments
///
/// * `calculators` - Constructed calculators, their order fixes the column order
/// * `x_test` - Test features
/// * `y_proba` - The classifier's probabilities for `x_test`
/// * `classifier` - The fitted primary classifier
/// * `options` - Per-calculator budget settings
pub fn evaluate(
    calculators: &[TrustCalculator],
    x_test: &Array2<f64>,
    y_proba: &Array2<f64>,
    classifier: &dyn ClassifierModel,
    options: &EvaluationOptions,
) -> EvaluationReport {
    log::info!(
        "Evaluating {} trust calculators on {} test rows",
        calculators.len(),
        x_test.nrows()
    );
    let outcomes: Vec<Outcome> = calculators
        .par_iter()
        .map(|c| run_one(c, x_test, y_proba, classifier, options))
        .collect();

    let mut report = EvaluationReport::default();
    for outcome in outcomes {
        report.timings_ms.push((outcome.strategy, outcome.elapsed_ms));
        report.columns.extend(outcome.columns);
        report.failures.extend(outcome.failure);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::{EntropyTrust, NeighborsTrust};
    use crate::data_handling::TrainingData;
    use crate::models::naive_bayes::NaiveBayesClassifier;
    use ndarray::array;

    #[test]
    fn failing_calculator_does_not_stop_the_run() {
        let train = TrainingData::unnamed(array![[0.0], [1.0], [5.0], [6.0]], vec![0, 0, 1, 1]).unwrap();
        let calculators = vec![
            TrustCalculator::Entropy(EntropyTrust::new(2).unwrap()),
            // three classes against two probability columns
            TrustCalculator::Entropy(EntropyTrust::new(3).unwrap()),
            TrustCalculator::Neighbors(NeighborsTrust::new(&train, 2, 2).unwrap()),
        ];
        let x_test = array![[0.5], [5.5]];
        let y_proba = array![[1.0, 0.0], [0.5, 0.5]];
        let report = evaluate(
            &calculators,
            &x_test,
            &y_proba,
            &NaiveBayesClassifier::default(),
            &EvaluationOptions::default(),
        );

        let names: Vec<&str> = report.columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Entropy", "Neighbors(k=2)"]);
        assert_eq!(report.column("Entropy").unwrap(), &vec![Some(1.0), Some(0.0)]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, ErrorKind::DimensionMismatch);
        assert_eq!(report.timings_ms.len(), 3);
    }

    #[test]
    fn construction_failures_lead_the_report() {
        let suite = CalculatorSuite {
            calculators: vec![TrustCalculator::Entropy(EntropyTrust::new(3).unwrap())],
            failures: vec![CalculatorFailure::new(
                "ConfidenceInterval(NaiveBayes, 0.9999)",
                &TrustError::ResamplingInsufficient {
                    confidence_level: 0.9999,
                    requested: 10,
                    required: 10_000,
                },
            )],
        };
        let report = suite.evaluate(
            &array![[0.0]],
            &array![[0.5, 0.5]],
            &NaiveBayesClassifier::default(),
            &EvaluationOptions::default(),
        );
        let kinds: Vec<ErrorKind> = report.failures.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::ResamplingInsufficient, ErrorKind::DimensionMismatch]);
        assert_eq!(report.failures[0].strategy, "ConfidenceInterval(NaiveBayes, 0.9999)");
        assert!(report.columns.is_empty());
    }
}
