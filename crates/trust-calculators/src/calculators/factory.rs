use std::time::Instant;

use ndarray::Array2;

use crate::budget::Budget;
use crate::calculators::{
    CombinedTrust, ConfidenceInterval, EntropyTrust, ExternalTrust, LimeTrust, MultiCombinedTrust,
    NeighborsTrust, SHAPTrust, TrustCalculator, TrustStrategy,
};
use crate::config::{CalculatorConfig, ModelConfig};
use crate::data_handling::TrainingData;
use crate::error::Result;
use crate::evaluation::{CalculatorFailure, CalculatorSuite, EvaluationOptions};
use crate::models::factory::build_model;

/// Construct (and fit, where the strategy needs it) one calculator.
///
/// # Arguments
///
/// * `config` - Which strategy to build, with its parameters
/// * `train` - Training split; its label set fixes the number of classes
/// * `background` - Rows summarizing the data for SHAP baselines
/// * `budget` - Bounds the bootstrap of a confidence interval
pub fn build_calculator(
    config: &CalculatorConfig,
    train: &TrainingData,
    background: &Array2<f64>,
    budget: &Budget,
) -> Result<TrustCalculator> {
    let norm = train.n_classes();
    let calculator = match config {
        CalculatorConfig::Entropy => TrustCalculator::Entropy(EntropyTrust::new(norm)?),
        CalculatorConfig::Neighbors { k } => {
            TrustCalculator::Neighbors(NeighborsTrust::new(train, *k, norm)?)
        }
        CalculatorConfig::Lime {
            num_samples,
            kernel_width,
            seed,
        } => TrustCalculator::Lime(LimeTrust::new(train, *num_samples, *kernel_width, *seed)?),
        CalculatorConfig::Shap {
            max_samples,
            items,
            reg,
            seed,
        } => TrustCalculator::Shap(SHAPTrust::new(
            background,
            *max_samples,
            *items,
            *reg,
            *seed,
            norm,
        )?),
        CalculatorConfig::External { delegate } => TrustCalculator::External(ExternalTrust::new(
            build_model(delegate.clone(), Some(norm)),
            train,
            norm,
        )?),
        CalculatorConfig::Combined { delegate, fusion } => {
            TrustCalculator::Combined(CombinedTrust::new(
                build_model(delegate.clone(), Some(norm)),
                train,
                norm,
                *fusion,
            )?)
        }
        CalculatorConfig::MultiCombined { delegates } => {
            let models = delegates
                .iter()
                .map(|d| build_model(d.clone(), Some(norm)))
                .collect();
            TrustCalculator::MultiCombined(MultiCombinedTrust::new(models, train, norm)?)
        }
        CalculatorConfig::ConfidenceInterval {
            confidence_level,
            n_resamples,
            reference,
            seed,
        } => TrustCalculator::ConfidenceInterval(ConfidenceInterval::with_budget(
            train,
            *confidence_level,
            *n_resamples,
            reference.clone(),
            *seed,
            budget,
        )?),
    };
    log::debug!("Built calculator {}", calculator.trust_strategy_name());
    Ok(calculator)
}

/// Column label of the calculator `config` describes, available even when
/// construction fails.
pub fn calculator_label(config: &CalculatorConfig, norm: usize) -> String {
    let model_name = |m: &ModelConfig| build_model(m.clone(), Some(norm)).name();
    match config {
        CalculatorConfig::Entropy => "Entropy".to_string(),
        CalculatorConfig::Neighbors { k } => format!("Neighbors(k={})", k),
        CalculatorConfig::Lime { num_samples, .. } => format!("LIME(samples={})", num_samples),
        CalculatorConfig::Shap { reg, .. } => format!("SHAP(reg={})", reg),
        CalculatorConfig::External { delegate } => format!("External({})", model_name(delegate)),
        CalculatorConfig::Combined { delegate, .. } => format!("Combined({})", model_name(delegate)),
        CalculatorConfig::MultiCombined { .. } => "MultiCombined".to_string(),
        CalculatorConfig::ConfidenceInterval {
            confidence_level,
            reference,
            ..
        } => format!("ConfidenceInterval({}, {})", model_name(reference), confidence_level),
    }
}

/// Build every configured calculator, each under its own budget.
///
/// A configuration that fails to build is recorded as a failure and the
/// remaining ones are still built.
pub fn build_calculators(
    configs: &[CalculatorConfig],
    train: &TrainingData,
    background: &Array2<f64>,
    options: &EvaluationOptions,
) -> CalculatorSuite {
    let mut suite = CalculatorSuite::default();
    for config in configs {
        let start = Instant::now();
        match build_calculator(config, train, background, &options.budget()) {
            Ok(calculator) => {
                log::info!(
                    "Prepared {} in {} ms",
                    calculator.trust_strategy_name(),
                    start.elapsed().as_millis()
                );
                suite.calculators.push(calculator);
            }
            Err(err) => {
                let failure = CalculatorFailure::new(&calculator_label(config, train.n_classes()), &err);
                log::warn!("{} could not be built ({}): {}", failure.strategy, failure.kind, failure.message);
                suite.failures.push(failure);
            }
        }
    }
    suite
}
