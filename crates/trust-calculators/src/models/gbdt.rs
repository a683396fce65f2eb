use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::Array2;

use crate::config::{ModelConfig, ModelType};
use crate::error::ClassifierError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_training_input, check_width, normalize_rows, resolve_n_classes};

const NAME: &str = "GBDT";

/// One binary booster per class. A class that is absent from the training
/// labels (or covers all of them) has nothing to separate and gets a constant.
enum OneVsRest {
    Boosted(GBDT),
    Constant(f64),
}

/// Gradient Boosting Decision Tree (GBDT) classifier, multi-class through
/// one-vs-rest log-likelihood boosters.
pub struct GBDTClassifier {
    models: Vec<OneVsRest>,
    params: ModelConfig,
    n_features: Option<usize>,
    fixed_classes: Option<usize>,
}

impl GBDTClassifier {
    pub fn new(params: ModelConfig) -> Self {
        GBDTClassifier {
            models: Vec::new(),
            params,
            n_features: None,
            fixed_classes: None,
        }
    }

    /// Fix the probability width to `n_classes` regardless of which labels
    /// show up in the training set.
    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.fixed_classes = Some(n_classes);
        self
    }

    fn booster_config(&self, feature_size: usize) -> Result<Config, ClassifierError> {
        match &self.params.model_type {
            ModelType::GBDT {
                max_depth,
                num_boost_round,
                debug,
                training_optimization_level,
            } => {
                let mut config = Config::new();

                config.set_feature_size(feature_size);
                config.set_shrinkage(self.params.learning_rate);
                config.set_max_depth(*max_depth);
                config.set_iterations(*num_boost_round as usize);
                config.set_debug(*debug);
                config.set_training_optimization_level(*training_optimization_level);
                config.set_loss("LogLikelyhood");
                Ok(config)
            }
            #[allow(unreachable_patterns)]
            other => Err(ClassifierError::Training {
                model: NAME.to_string(),
                message: format!("expected ModelType::GBDT params, got {:?}", other),
            }),
        }
    }
}

fn to_data_vec(x: &Array2<f64>, labels: Option<&[f32]>) -> DataVec {
    let mut data = DataVec::with_capacity(x.nrows());
    for (i, row) in x.rows().into_iter().enumerate() {
        let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let label = labels.map_or(0.0, |l| l[i]);
        data.push(Data::new_training_data(features, 1.0, label, None));
    }
    data
}

impl ClassifierModel for GBDTClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ClassifierError> {
        check_training_input(NAME, x, y)?;
        let n_classes = resolve_n_classes(self.fixed_classes, y);
        let config = self.booster_config(x.ncols())?;

        let mut models = Vec::with_capacity(n_classes);
        for class in 0..n_classes {
            let positives = y.iter().filter(|&&label| label == class).count();
            if positives == 0 || positives == y.len() {
                let constant = if positives == 0 { 0.0 } else { 1.0 };
                models.push(OneVsRest::Constant(constant));
                continue;
            }
            // LogLikelyhood loss expects labels in {-1, 1}
            let labels: Vec<f32> = y
                .iter()
                .map(|&label| if label == class { 1.0 } else { -1.0 })
                .collect();
            let mut train_x = to_data_vec(x, Some(&labels));
            let mut booster = GBDT::new(&config);
            booster.fit(&mut train_x);
            models.push(OneVsRest::Boosted(booster));
        }
        log::debug!(
            "Fitted {} one-vs-rest boosters on {} rows x {} features",
            models.len(),
            x.nrows(),
            x.ncols()
        );

        self.models = models;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict_prob(&self, x: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let n_features = self
            .n_features
            .ok_or_else(|| ClassifierError::NotFitted(NAME.to_string()))?;
        check_width(NAME, n_features, x.ncols())?;

        let test_x = to_data_vec(x, None);
        let mut probs = Array2::zeros((x.nrows(), self.models.len()));
        for (class, model) in self.models.iter().enumerate() {
            match model {
                OneVsRest::Boosted(booster) => {
                    let scores = booster.predict(&test_x);
                    for (row, score) in scores.iter().enumerate() {
                        probs[(row, class)] = (*score as f64).clamp(0.0, 1.0);
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
        NAME.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn separable(n: usize) -> (Array2<f64>, Vec<usize>) {
        let x = Array2::from_shape_fn((n, 2), |(r, c)| {
            let class = (r % 3) as f64;
            if c == 0 {
                class * 4.0 + (r as f64 * 0.01)
            } else {
                (r % 5) as f64
            }
        });
        let y = (0..n).map(|r| r % 3).collect();
        (x, y)
    }

    #[test]
    fn gbdt_predicts_separable_classes() {
        let (x, y) = separable(60);
        let mut classifier = GBDTClassifier::new(ModelConfig::default());
        classifier.fit(&x, &y).unwrap();

        let probs = classifier.predict_prob(&x).unwrap();
        assert_eq!(probs.shape(), &[60, 3]);
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        let predicted = classifier.predict_class(&x).unwrap();
        let hits = predicted.iter().zip(&y).filter(|(p, t)| p == t).count();
        assert!(hits >= 54, "only {} of 60 correct", hits);
    }

    #[test]
    fn gbdt_keeps_fixed_width_for_missing_class() {
        let (x, y) = separable(30);
        let mut classifier = GBDTClassifier::new(ModelConfig::default()).with_classes(4);
        classifier.fit(&x, &y).unwrap();
        let probs = classifier.predict_prob(&x).unwrap();
        assert_eq!(probs.ncols(), 4);
        assert!(probs.column(3).iter().all(|&p| p == 0.0));
    }

    #[test]
    fn gbdt_requires_fit() {
        let classifier = GBDTClassifier::new(ModelConfig::default());
        let err = classifier.predict_prob(&Array2::zeros((1, 2))).unwrap_err();
        assert_eq!(err, ClassifierError::NotFitted("GBDT".to_string()));
    }
}
