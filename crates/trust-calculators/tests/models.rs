use ndarray::Array2;

use trust_calculators::config::{ModelConfig, ModelType};
use trust_calculators::models::factory::build_model;
use trust_calculators::ClassifierError;

fn toy() -> (Array2<f64>, Vec<usize>) {
    // tiny dataset, three classes along a diagonal
    let x = Array2::from_shape_vec(
        (9, 2),
        vec![
            0.0, 0.1, // class 0
            0.1, 0.0, // class 0
            0.2, 0.2, // class 0
            2.0, 2.1, // class 1
            2.1, 1.9, // class 1
            1.9, 2.0, // class 1
            4.0, 4.2, // class 2
            4.1, 3.9, // class 2
            3.9, 4.0, // class 2
        ],
    )
    .expect("failed to create feature matrix");
    (x, vec![0, 0, 0, 1, 1, 1, 2, 2, 2])
}

fn configs() -> Vec<ModelConfig> {
    vec![
        ModelConfig::new(
            0.1,
            ModelType::GBDT {
                max_depth: 3,
                num_boost_round: 5,
                debug: false,
                training_optimization_level: 2,
            },
        ),
        ModelConfig::naive_bayes(),
        ModelConfig::k_neighbors(3),
        ModelConfig::lda(),
        #[cfg(feature = "linfa")]
        ModelConfig::decision_tree(100),
        #[cfg(feature = "linfa")]
        ModelConfig::random_forest(10),
    ]
}

#[test]
fn factory_models_fit_and_predict_probabilities() {
    let (x, y) = toy();
    for params in configs() {
        let mut model = build_model(params, None);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_classes(), Some(3));

        let probs = model.predict_prob(&x).unwrap();
        assert_eq!(probs.dim(), (9, 3), "{}", model.name());
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9, "{}", model.name());
        }
        let classes = model.predict_class(&x).unwrap();
        let hits = classes.iter().zip(&y).filter(|(p, t)| p == t).count();
        assert!(hits >= 7, "{} got {} of 9 right", model.name(), hits);
    }
}

#[test]
fn fixed_width_survives_missing_classes() {
    let (x, y) = toy();
    // only the first two classes present
    let x = x.slice(ndarray::s![0..6, ..]).to_owned();
    let y = y[0..6].to_vec();
    for params in configs() {
        let mut model = build_model(params, Some(4));
        model.fit(&x, &y).unwrap();
        let probs = model.predict_prob(&x).unwrap();
        assert_eq!(probs.ncols(), 4, "{}", model.name());
    }
}

#[test]
fn predicting_before_fit_fails() {
    for params in configs() {
        let model = build_model(params, Some(2));
        let err = model.predict_prob(&Array2::zeros((1, 2))).unwrap_err();
        assert!(matches!(err, ClassifierError::NotFitted(_)), "{}", model.name());
    }
}
