use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::ClassifierModel;

/// Build a boxed, unfitted classifier model from a `ModelConfig`.
///
/// When `n_classes` is given the model always reports that many probability
/// columns, even if some classes are missing from its training labels.
pub fn build_model(params: ModelConfig, n_classes: Option<usize>) -> Box<dyn ClassifierModel> {
    match params.model_type {
        ModelType::GBDT { .. } => {
            let model = crate::models::gbdt::GBDTClassifier::new(params);
            match n_classes {
                Some(k) => Box::new(model.with_classes(k)),
                None => Box::new(model),
            }
        }

        ModelType::NaiveBayes { var_smoothing } => {
            let model = crate::models::naive_bayes::NaiveBayesClassifier::new(var_smoothing);
            match n_classes {
                Some(k) => Box::new(model.with_classes(k)),
                None => Box::new(model),
            }
        }

        ModelType::KNeighbors { k } => {
            let model = crate::models::knn::KNeighborsClassifier::new(k);
            match n_classes {
                Some(n) => Box::new(model.with_classes(n)),
                None => Box::new(model),
            }
        }

        ModelType::LDA { shrinkage } => {
            let model = crate::models::lda::LdaClassifier::new(shrinkage);
            match n_classes {
                Some(k) => Box::new(model.with_classes(k)),
                None => Box::new(model),
            }
        }

        #[cfg(feature = "linfa")]
        ModelType::DecisionTree { max_depth } => {
            let model = crate::models::decision_tree::DecisionTreeClassifier::new(max_depth);
            match n_classes {
                Some(k) => Box::new(model.with_classes(k)),
                None => Box::new(model),
            }
        }

        #[cfg(feature = "linfa")]
        ModelType::RandomForest {
            n_trees,
            max_depth,
            seed,
        } => {
            let model =
                crate::models::random_forest::RandomForestClassifier::new(n_trees, max_depth, seed);
            match n_classes {
                Some(k) => Box::new(model.with_classes(k)),
                None => Box::new(model),
            }
        }

        #[cfg(feature = "linfa")]
        ModelType::SVM { .. } => {
            let model = crate::models::svm::SVMClassifier::new(params);
            match n_classes {
                Some(k) => Box::new(model.with_classes(k)),
                None => Box::new(model),
            }
        }

        #[cfg(feature = "linfa")]
        ModelType::LogisticRegression {
            max_iterations,
            alpha,
        } => {
            let model =
                crate::models::logistic::LogisticRegressionClassifier::new(max_iterations, alpha);
            match n_classes {
                Some(k) => Box::new(model.with_classes(k)),
                None => Box::new(model),
            }
        } // When compiled, `ModelType` only contains the variants enabled by
          // features, so no catch-all arm is necessary.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_names_models() {
        assert_eq!(build_model(ModelConfig::default(), None).name(), "GBDT");
        assert_eq!(build_model(ModelConfig::naive_bayes(), None).name(), "NaiveBayes");
        assert_eq!(
            build_model(ModelConfig::k_neighbors(11), Some(3)).name(),
            "11NearestNeighbors"
        );
        assert_eq!(build_model(ModelConfig::lda(), None).name(), "LDA");
    }

    #[cfg(feature = "linfa")]
    #[test]
    fn factory_names_linfa_models() {
        assert_eq!(
            build_model(ModelConfig::decision_tree(100), Some(2)).name(),
            "DecisionTree(depth=100)"
        );
        assert_eq!(
            build_model(ModelConfig::random_forest(10), Some(2)).name(),
            "RandomForest(trees=10)"
        );
        let svm = ModelConfig::new(0.1, "svm".parse().unwrap());
        assert_eq!(
            build_model(svm, None).name(),
            "SupportVectorMachine(kernel=linear)"
        );
    }

    #[test]
    fn unfitted_models_report_no_width() {
        assert_eq!(build_model(ModelConfig::naive_bayes(), Some(3)).n_classes(), None);
    }
}
