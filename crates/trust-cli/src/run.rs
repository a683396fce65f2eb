//! The `evaluate` workflow: per dataset, split, build the calculators once,
//! then fit every primary classifier and score its test predictions.
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use trust_calculators::calculators::build_calculators;
use trust_calculators::data_handling::train_test_split;
use trust_calculators::evaluation::EvaluationOptions;
use trust_calculators::models::factory::build_model;
use trust_calculators::stats::{accuracy, row_argmax};

use crate::config::EvaluationConfig;
use crate::dataset::{clean_name, read_tabular_dataset};
use crate::output::{write_failures, write_trust_output};

/// Run every dataset of `config`; a dataset that fails is logged and skipped.
///
/// Returns the output files written.
pub fn run_evaluation(config: &EvaluationConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory: {}", config.output_dir))?;

    let mut written = Vec::new();
    for dataset in &config.datasets {
        match evaluate_dataset(dataset, config) {
            Ok(files) => written.extend(files),
            Err(e) => log::error!("Dataset '{}' skipped: {:#}", dataset, e),
        }
    }
    Ok(written)
}

fn evaluate_dataset(dataset: &str, config: &EvaluationConfig) -> Result<Vec<PathBuf>> {
    if !Path::new(dataset).is_file() {
        anyhow::bail!("Dataset '{}' does not exist / not reachable", dataset);
    }
    log::info!("Processing dataset {}", dataset);
    let data = read_tabular_dataset(dataset, &config.label_column, config.limit)?;
    data.log_summary();
    let (train, test) = train_test_split(&data, config.test_fraction, config.split_seed)?;

    let options = EvaluationOptions {
        timeout: config.timeout_ms.map(Duration::from_millis),
        cancel: None,
    };
    log::info!("Preparing {} trust calculators", config.calculators.len());
    let suite = build_calculators(&config.calculators, &train, &test.x, &options);
    if !suite.failures.is_empty() {
        log::warn!(
            "{} of {} trust calculators could not be built",
            suite.failures.len(),
            config.calculators.len()
        );
    }

    let mut written = Vec::new();
    for model_config in &config.classifiers {
        let mut classifier = build_model(model_config.clone(), Some(train.n_classes()));
        let name = classifier.name();
        log::info!("Processing dataset '{}' with classifier {}", dataset, name);

        let start = Instant::now();
        classifier
            .fit(&train.x, &train.y)
            .with_context(|| format!("Failed to train {}", name))?;
        let train_ms = start.elapsed().as_millis();

        let start = Instant::now();
        let y_proba = classifier.predict_prob(&test.x)?;
        let predicted = row_argmax(&y_proba);
        let test_ms = start.elapsed().as_millis();
        log::info!(
            "{} train/test in {}/{} ms with accuracy {:.4}",
            name,
            train_ms,
            test_ms,
            accuracy(&predicted, &test.y)
        );

        let report = suite.evaluate(&test.x, &y_proba, classifier.as_ref(), &options);

        let stem = format!("{}_{}", clean_name(dataset), name);
        let file_out = Path::new(&config.output_dir).join(format!("{}.csv", stem));
        log::info!("Writing {:?}", file_out);
        write_trust_output(&file_out, &test, &predicted, &y_proba, &report)?;
        if !report.failures.is_empty() {
            let failures_out = Path::new(&config.output_dir).join(format!("{}.failures.json", stem));
            log::warn!(
                "{} calculators failed for {}, see {:?}",
                report.failures.len(),
                name,
                failures_out
            );
            write_failures(&failures_out, &report.failures)?;
        }
        written.push(file_out);
    }
    Ok(written)
}
