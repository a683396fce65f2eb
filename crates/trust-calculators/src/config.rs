use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Central configuration for classifier models in the crate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub learning_rate: f32,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    GBDT {
        max_depth: u32,
        num_boost_round: u32,
        debug: bool,
        training_optimization_level: u8,
    },
    NaiveBayes {
        var_smoothing: f64,
    },
    KNeighbors {
        k: usize,
    },
    /// Linear discriminant analysis; `shrinkage` in [0, 1] pulls the pooled
    /// covariance towards a scaled identity.
    LDA {
        shrinkage: f64,
    },
    #[cfg(feature = "linfa")]
    DecisionTree {
        max_depth: usize,
    },
    #[cfg(feature = "linfa")]
    RandomForest {
        n_trees: usize,
        max_depth: Option<usize>,
        seed: u64,
    },
    #[cfg(feature = "linfa")]
    SVM {
        eps: f64,
        c: (f64, f64),
        kernel: String,
        gaussian_kernel_eps: f64,
        polynomial_kernel_constant: f64,
        polynomial_kernel_degree: f64,
    },
    #[cfg(feature = "linfa")]
    LogisticRegression {
        max_iterations: u64,
        alpha: f64,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::GBDT {
            max_depth: 6,
            num_boost_round: 50,
            debug: false,
            training_optimization_level: 2,
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gbdt" | "xgb" | "xgboost" => Ok(ModelType::default()),
            "bayes" | "naivebayes" => Ok(ModelType::NaiveBayes {
                var_smoothing: 1e-9,
            }),
            "knn" | "kneighbors" => Ok(ModelType::KNeighbors { k: 11 }),
            "lda" => Ok(ModelType::LDA { shrinkage: 0.0 }),
            #[cfg(feature = "linfa")]
            "dt" | "dtree" | "decisiontree" => Ok(ModelType::DecisionTree { max_depth: 100 }),
            #[cfg(feature = "linfa")]
            "rf" | "randomforest" => Ok(ModelType::RandomForest {
                n_trees: 10,
                max_depth: None,
                seed: 0,
            }),
            #[cfg(feature = "linfa")]
            "svm" | "supportvectormachine" => Ok(ModelType::SVM {
                eps: 1e-7,
                c: (1.0, 1.0),
                kernel: "linear".to_string(),
                gaussian_kernel_eps: 0.1,
                polynomial_kernel_constant: 1.0,
                polynomial_kernel_degree: 1.0,
            }),
            #[cfg(feature = "linfa")]
            "lr" | "logistic" | "logisticregression" => Ok(ModelType::LogisticRegression {
                max_iterations: 100,
                alpha: 1.0,
            }),
            _ => Err(format!(
                "Unknown model type: {}. Tree, SVM and logistic regression models need `--features linfa`",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(learning_rate: f32, model_type: ModelType) -> Self {
        Self {
            learning_rate,
            model_type,
        }
    }

    pub fn naive_bayes() -> Self {
        Self::new(0.1, ModelType::NaiveBayes { var_smoothing: 1e-9 })
    }

    pub fn k_neighbors(k: usize) -> Self {
        Self::new(0.1, ModelType::KNeighbors { k })
    }

    pub fn lda() -> Self {
        Self::new(0.1, ModelType::LDA { shrinkage: 0.0 })
    }

    #[cfg(feature = "linfa")]
    pub fn decision_tree(max_depth: usize) -> Self {
        Self::new(0.1, ModelType::DecisionTree { max_depth })
    }

    #[cfg(feature = "linfa")]
    pub fn random_forest(n_trees: usize) -> Self {
        Self::new(
            0.1,
            ModelType::RandomForest {
                n_trees,
                max_depth: None,
                seed: 0,
            },
        )
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            model_type: ModelType::default(),
        }
    }
}

/// How SHAP attributions are reduced to the subset that counts as "explaining"
/// a prediction.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttributionPolicy {
    /// Subset size chosen by the Bayesian information criterion
    Bic,
    /// Subset size chosen by the Akaike information criterion
    Aic,
    /// Fixed subset of the `n` largest attributions
    TopK(usize),
}

impl Default for AttributionPolicy {
    fn default() -> Self {
        AttributionPolicy::Bic
    }
}

impl FromStr for AttributionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "bic" => Ok(AttributionPolicy::Bic),
            "aic" => Ok(AttributionPolicy::Aic),
            _ => match lower.strip_prefix("top") {
                Some(n) => n
                    .trim_start_matches(['_', 'k', ':'])
                    .parse()
                    .map(AttributionPolicy::TopK)
                    .map_err(|_| format!("Unknown attribution policy: {}", s)),
                None => Err(format!("Unknown attribution policy: {}", s)),
            },
        }
    }
}

impl fmt::Display for AttributionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributionPolicy::Bic => write!(f, "bic"),
            AttributionPolicy::Aic => write!(f, "aic"),
            AttributionPolicy::TopK(n) => write!(f, "top{}", n),
        }
    }
}

/// Fusion of primary and delegate confidence into one extra component.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FusionRule {
    #[default]
    Mean,
    Product,
    Min,
}

impl FusionRule {
    pub fn fuse(&self, primary: f64, delegate: f64) -> f64 {
        match self {
            FusionRule::Mean => (primary + delegate) / 2.0,
            FusionRule::Product => primary * delegate,
            FusionRule::Min => primary.min(delegate),
        }
    }
}

fn default_k() -> usize {
    19
}

fn default_samples() -> usize {
    100
}

fn default_confidence_level() -> f64 {
    0.9999
}

/// Delegates of the default MultiCombined calculator: a small random forest,
/// boosting and a deep decision tree.
#[cfg(feature = "linfa")]
fn default_delegates() -> Vec<ModelConfig> {
    vec![
        ModelConfig::random_forest(10),
        ModelConfig::default(),
        ModelConfig::decision_tree(100),
    ]
}

/// Without `linfa` there are no tree ensembles; nearest neighbours and naive
/// Bayes stand in for them.
#[cfg(not(feature = "linfa"))]
fn default_delegates() -> Vec<ModelConfig> {
    vec![
        ModelConfig::k_neighbors(11),
        ModelConfig::default(),
        ModelConfig::naive_bayes(),
    ]
}

/// Declarative description of one trust calculator.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CalculatorConfig {
    Entropy,
    Neighbors {
        #[serde(default = "default_k")]
        k: usize,
    },
    Lime {
        #[serde(default = "default_samples")]
        num_samples: usize,
        #[serde(default)]
        kernel_width: Option<f64>,
        #[serde(default)]
        seed: u64,
    },
    Shap {
        #[serde(default = "default_samples")]
        max_samples: usize,
        #[serde(default = "default_samples")]
        items: usize,
        #[serde(default)]
        reg: AttributionPolicy,
        #[serde(default)]
        seed: u64,
    },
    External {
        delegate: ModelConfig,
    },
    Combined {
        delegate: ModelConfig,
        #[serde(default)]
        fusion: FusionRule,
    },
    MultiCombined {
        delegates: Vec<ModelConfig>,
    },
    ConfidenceInterval {
        #[serde(default = "default_confidence_level")]
        confidence_level: f64,
        #[serde(default)]
        n_resamples: Option<usize>,
        #[serde(default = "ModelConfig::naive_bayes")]
        reference: ModelConfig,
        #[serde(default)]
        seed: u64,
    },
}

impl CalculatorConfig {
    /// The eight calculators of a standard evaluation run.
    pub fn default_suite() -> Vec<CalculatorConfig> {
        vec![
            CalculatorConfig::Entropy,
            CalculatorConfig::Lime {
                num_samples: 100,
                kernel_width: None,
                seed: 0,
            },
            CalculatorConfig::Shap {
                max_samples: 100,
                items: 100,
                reg: AttributionPolicy::Bic,
                seed: 0,
            },
            CalculatorConfig::Neighbors { k: 19 },
            CalculatorConfig::External {
                delegate: ModelConfig::naive_bayes(),
            },
            CalculatorConfig::Combined {
                delegate: ModelConfig::default(),
                fusion: FusionRule::Mean,
            },
            CalculatorConfig::MultiCombined {
                delegates: default_delegates(),
            },
            CalculatorConfig::ConfidenceInterval {
                confidence_level: 0.9999,
                n_resamples: None,
                reference: ModelConfig::naive_bayes(),
                seed: 0,
            },
        ]
    }
}
