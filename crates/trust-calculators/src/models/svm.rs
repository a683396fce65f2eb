use linfa::dataset::Pr;
use linfa::prelude::*;
use linfa::Dataset;
use linfa_svm::{Svm, SvmParams};
use ndarray::{Array1, Array2};

use crate::config::{ModelConfig, ModelType};
use crate::error::ClassifierError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_training_input, check_width, normalize_rows, resolve_n_classes};

enum OneVsRest {
    Platt(Svm<f64, Pr>),
    Constant(f64),
}

/// Support vector machine from `linfa-svm` with Platt-scaled outputs, one
/// binary machine per class.
pub struct SVMClassifier {
    models: Vec<OneVsRest>,
    params: ModelConfig,
    n_features: Option<usize>,
    fixed_classes: Option<usize>,
}

impl SVMClassifier {
    pub fn new(params: ModelConfig) -> Self {
        SVMClassifier {
            models: Vec::new(),
            params,
            n_features: None,
            fixed_classes: None,
        }
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.fixed_classes = Some(n_classes);
        self
    }

    fn kernel(&self) -> &str {
        match &self.params.model_type {
            ModelType::SVM { kernel, .. } => kernel,
            _ => "unknown",
        }
    }

    fn training_error(&self, message: String) -> ClassifierError {
        ClassifierError::Training {
            model: self.name(),
            message,
        }
    }

    fn machine_params(&self) -> Result<SvmParams<f64, Pr>, ClassifierError> {
        match &self.params.model_type {
            ModelType::SVM {
                eps,
                c,
                kernel,
                gaussian_kernel_eps,
                polynomial_kernel_constant,
                polynomial_kernel_degree,
            } => {
                let (c1, c2) = *c;
                let params = Svm::<f64, Pr>::params().eps(*eps).pos_neg_weights(c1, c2);
                match kernel.as_str() {
                    "linear" => Ok(params.linear_kernel()),
                    "gauss" => Ok(params.gaussian_kernel(*gaussian_kernel_eps)),
                    "poly" => Ok(params.polynomial_kernel(
                        *polynomial_kernel_constant,
                        *polynomial_kernel_degree,
                    )),
                    other => Err(self.training_error(format!(
                        "unsupported kernel type: {}. Valid options are: linear, gauss, poly",
                        other
                    ))),
                }
            }
            other => Err(self.training_error(format!(
                "expected ModelType::SVM params, got {:?}",
                other
            ))),
        }
    }
}

impl ClassifierModel for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError> {
        check_training_input(&self.name(), x, y)?;
        let n_classes = resolve_n_classes(self.fixed_classes, y);
        let params = self.machine_params()?;

        let mut models = Vec::with_capacity(n_classes);
        for class in 0..n_classes {
            let positives = y.iter().filter(|&&label| label == class).count();
            if positives == 0 || positives == y.len() {
                let constant = if positives == 0 { 0.0 } else { 1.0 };
                models.push(OneVsRest::Constant(constant));
                continue;
            }
            let targets = Array1::from_iter(y.iter().map(|&label| label == class));
            let dataset = Dataset::new(x.clone(), targets);
            let machine = <SvmParams<f64, Pr> as Fit<_, _, _>>::fit(&params, &dataset)
                .map_err(|e| self.training_error(e.to_string()))?;
            models.push(OneVsRest::Platt(machine));
        }
        log::debug!(
            "Fitted {} one-vs-rest machines ({} kernel) on {} rows",
            models.len(),
            self.kernel(),
            x.nrows()
        );

        self.models = models;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let n_features = self
            .n_features
            .ok_or_else(|| ClassifierError::NotFitted(self.name()))?;
        check_width(&self.name(), n_features, x.ncols())?;

        let mut probs = Array2::zeros((x.nrows(), self.models.len()));
        for (class, model) in self.models.iter().enumerate() {
            match model {
                OneVsRest::Platt(machine) => {
                    let scores: Array1<Pr> = machine.predict(x);
                    for (row, score) in scores.iter().enumerate() {
                        probs[(row, class)] = f64::from(**score);
                    }
                }
                OneVsRest::Constant(value) => probs.column_mut(class).fill(*value),
            }
        }
        normalize_rows(&mut probs);
        Ok(probs)
    }

    fn n_classes(&self) -> Option<usize> {
        self.n_features.map(|_| self.models.len())
    }

    fn name(&self) -> String {
        format!("SupportVectorMachine(kernel={})", self.kernel())
    }
}
