//! Evaluation run configuration, loaded from JSON with CLI overrides.
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use trust_calculators::config::{CalculatorConfig, ModelConfig, ModelType};

/// Everything an `evaluate` run needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// CSV/TSV dataset files, processed one after another
    pub datasets: Vec<String>,
    /// Column holding the class labels
    pub label_column: String,
    /// Keep only the first `limit` rows of each dataset
    pub limit: Option<usize>,
    pub test_fraction: f64,
    pub split_seed: u64,
    /// Primary classifiers, each evaluated with every calculator
    pub classifiers: Vec<ModelConfig>,
    pub calculators: Vec<CalculatorConfig>,
    /// Wall-clock limit in milliseconds for building one calculator and,
    /// separately, for each of its scoring calls
    pub timeout_ms: Option<u64>,
    pub output_dir: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            datasets: Vec::new(),
            label_column: String::from("label"),
            limit: None,
            test_fraction: 0.5,
            split_seed: 0,
            classifiers: vec![ModelConfig::default(), ModelConfig::naive_bayes()],
            calculators: CalculatorConfig::default_suite(),
            timeout_ms: None,
            output_dir: String::from("output_folder"),
        }
    }
}

/// Load an evaluation configuration from a JSON file.
pub fn load_evaluation_config<P: AsRef<Path>>(path: P) -> Result<EvaluationConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: EvaluationConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

impl EvaluationConfig {
    /// Start from the config file (or the defaults) and apply CLI overrides.
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => load_evaluation_config(path)?,
            None => EvaluationConfig::default(),
        };

        if let Some(datasets) = matches.get_many::<String>("dataset") {
            config.datasets = datasets.cloned().collect();
        }
        if let Some(label) = matches.get_one::<String>("label_column") {
            config.label_column = label.clone();
        }
        if let Some(limit) = matches.get_one::<usize>("limit") {
            config.limit = Some(*limit);
        }
        if let Some(fraction) = matches.get_one::<f64>("test_fraction") {
            config.test_fraction = *fraction;
        }
        if let Some(seed) = matches.get_one::<u64>("seed") {
            config.split_seed = *seed;
        }
        if let Some(models) = matches.get_many::<String>("classifier") {
            config.classifiers = models
                .map(|name| {
                    ModelType::from_str(name)
                        .map(|model_type| ModelConfig::new(0.1, model_type))
                        .map_err(anyhow::Error::msg)
                })
                .collect::<Result<_>>()?;
        }
        if let Some(timeout) = matches.get_one::<u64>("timeout_ms") {
            config.timeout_ms = Some(*timeout);
        }
        if let Some(output_dir) = matches.get_one::<String>("output_dir") {
            config.output_dir = output_dir.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            anyhow::bail!("No dataset given, pass --dataset or list `datasets` in the config");
        }
        if self.classifiers.is_empty() {
            anyhow::bail!("At least one classifier is required");
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            anyhow::bail!("test_fraction must lie in (0, 1), got {}", self.test_fraction);
        }
        Ok(())
    }
}
