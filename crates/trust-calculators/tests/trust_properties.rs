mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use ndarray::{Array2, Axis};

use common::{two_blobs, BrokenClassifier, CancellingClassifier, ConstantClassifier};
use trust_calculators::budget::Budget;
use trust_calculators::calculators::{
    build_calculator, build_calculators, CombinedTrust, ConfidenceInterval, EntropyTrust,
    ExternalTrust, LimeTrust, MultiCombinedTrust, NeighborsTrust,
};
use trust_calculators::config::{CalculatorConfig, FusionRule, ModelConfig};
use trust_calculators::data_handling::{train_test_split, TrainingData};
use trust_calculators::evaluation::EvaluationOptions;
use trust_calculators::models::classifier_trait::ClassifierModel;
use trust_calculators::models::naive_bayes::NaiveBayesClassifier;
use trust_calculators::stats::{row_argmax, select_per_row};
use trust_calculators::{ErrorKind, TrustError, TrustStrategy};

fn constant_proba(n_rows: usize, row: &[f64]) -> Array2<f64> {
    Array2::from_shape_fn((n_rows, row.len()), |(_, c)| row[c])
}

#[test]
fn entropy_extremes_are_exact() {
    let calc = EntropyTrust::new(4).unwrap();
    let y_proba = ndarray::array![
        [0.0, 0.0, 1.0, 0.0],
        [1.0, 0.0, 0.0, 0.0],
        [0.25, 0.25, 0.25, 0.25]
    ];
    let x_test = Array2::zeros((3, 1));
    let result = calc
        .trust_scores(&x_test, &y_proba, &ConstantClassifier::new(&[0.25; 4]))
        .unwrap();
    assert_eq!(result.scores().unwrap(), &vec![Some(1.0), Some(1.0), Some(0.0)]);
}

#[test]
fn end_to_end_default_suite() {
    let data = two_blobs(110, 3.0, 42);
    let (train, test) = train_test_split(&data, 10.0 / 110.0, 7).unwrap();
    assert_eq!(train.n_samples(), 100);
    assert_eq!(test.n_samples(), 10);

    let primary = ConstantClassifier::new(&[0.9, 0.1]);
    let y_proba = primary.predict_prob(&test.x).unwrap();

    let options = EvaluationOptions::default();
    let suite = build_calculators(&CalculatorConfig::default_suite(), &train, &test.x, &options);
    assert_eq!(suite.calculators.len(), 8);
    let report = suite.evaluate(&test.x, &y_proba, &primary, &options);

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    for (name, column) in &report.columns {
        assert_eq!(column.len(), 10, "column {}", name);
    }

    for score in report.column("Entropy").unwrap() {
        let rounded = (score.unwrap() * 1000.0).round() / 1000.0;
        assert_eq!(rounded, 0.531);
    }
    // A constant classifier is perfectly explained locally and has nothing to attribute.
    for score in report.column("LIME(samples=100)").unwrap() {
        assert_eq!(*score, Some(1.0));
    }
    for score in report.column("SHAP(reg=bic)").unwrap() {
        assert_eq!(*score, Some(0.0));
    }
    for score in report.column("MultiCombined_primary").unwrap() {
        assert!((score.unwrap() - 0.9).abs() < 1e-12);
    }
}

#[test]
fn neighbors_with_k_beyond_training_size_is_constant() {
    // 12 rows of class 0, 8 of class 1
    let x = Array2::from_shape_fn((20, 2), |(r, c)| (r * 3 + c) as f64);
    let y: Vec<usize> = (0..20).map(|r| usize::from(r >= 12)).collect();
    let train = TrainingData::unnamed(x, y).unwrap();
    let calc = NeighborsTrust::new(&train, 25, 2).unwrap();

    let x_test = Array2::from_shape_fn((6, 2), |(r, c)| (r * 11 + c) as f64 - 4.0);
    let y_proba = constant_proba(6, &[0.7, 0.3]);
    let result = calc
        .trust_scores(&x_test, &y_proba, &ConstantClassifier::new(&[0.7, 0.3]))
        .unwrap();
    for score in result.scores().unwrap() {
        assert!((score.unwrap() - 0.6).abs() < 1e-12);
    }
}

#[test]
fn identical_delegate_reproduces_primary_confidence() {
    let data = two_blobs(60, 1.5, 3);
    let (train, test) = train_test_split(&data, 0.25, 3).unwrap();
    let mut primary = NaiveBayesClassifier::default().with_classes(2);
    primary.fit(&train.x, &train.y).unwrap();
    let y_proba = primary.predict_prob(&test.x).unwrap();
    let own_confidence = select_per_row(&y_proba, &row_argmax(&y_proba));

    let external =
        ExternalTrust::new(Box::new(NaiveBayesClassifier::default()), &train, 2).unwrap();
    let scores = external.trust_scores(&test.x, &y_proba, &primary).unwrap();
    for (got, want) in scores.scores().unwrap().iter().zip(&own_confidence) {
        assert!((got.unwrap() - want).abs() < 1e-12);
    }

    let combined = CombinedTrust::new(
        Box::new(NaiveBayesClassifier::default()),
        &train,
        2,
        FusionRule::Mean,
    )
    .unwrap();
    let result = combined.trust_scores(&test.x, &y_proba, &primary).unwrap();
    for key in ["primary", "delegate", "fused"] {
        for (got, want) in result.component(key).unwrap().iter().zip(&own_confidence) {
            assert!((got.unwrap() - want).abs() < 1e-12, "component {}", key);
        }
    }
}

#[test]
fn four_nines_need_ten_thousand_resamples() {
    let train = two_blobs(30, 2.0, 1);
    let err = ConfidenceInterval::new(&train, 0.9999, Some(9_999), ModelConfig::naive_bayes(), 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResamplingInsufficient);

    let config = CalculatorConfig::ConfidenceInterval {
        confidence_level: 0.9999,
        n_resamples: Some(100),
        reference: ModelConfig::naive_bayes(),
        seed: 0,
    };
    assert!(matches!(
        build_calculator(&config, &train, &train.x, &Budget::unbounded()),
        Err(TrustError::ResamplingInsufficient { required: 10_000, .. })
    ));
}

#[test]
fn single_delegate_multi_combined_matches_combined() {
    let data = two_blobs(80, 2.0, 11);
    let (train, test) = train_test_split(&data, 0.2, 11).unwrap();
    let primary = ConstantClassifier::new(&[0.35, 0.65]);
    let y_proba = primary.predict_prob(&test.x).unwrap();

    let combined =
        CombinedTrust::new(Box::new(NaiveBayesClassifier::default()), &train, 2, FusionRule::Mean)
            .unwrap();
    let delegates: Vec<Box<dyn ClassifierModel>> = vec![Box::new(NaiveBayesClassifier::default())];
    let multi = MultiCombinedTrust::new(delegates, &train, 2).unwrap();

    let a = combined.trust_scores(&test.x, &y_proba, &primary).unwrap();
    let b = multi.trust_scores(&test.x, &y_proba, &primary).unwrap();
    assert_eq!(a.component("primary"), b.component("primary"));
    assert_eq!(a.component("delegate"), b.component("NaiveBayes"));
}

#[test]
fn every_calculator_returns_one_score_per_row() {
    let data = two_blobs(90, 2.5, 5);
    let (train, test) = train_test_split(&data, 0.3, 5).unwrap();
    let mut primary = NaiveBayesClassifier::default().with_classes(2);
    primary.fit(&train.x, &train.y).unwrap();
    let y_proba = primary.predict_prob(&test.x).unwrap();

    let configs = vec![
        CalculatorConfig::Entropy,
        CalculatorConfig::Neighbors { k: 5 },
        CalculatorConfig::Lime {
            num_samples: 30,
            kernel_width: None,
            seed: 2,
        },
        CalculatorConfig::Shap {
            max_samples: 10,
            items: 5,
            reg: Default::default(),
            seed: 2,
        },
        CalculatorConfig::MultiCombined {
            delegates: vec![ModelConfig::k_neighbors(3), ModelConfig::naive_bayes()],
        },
        CalculatorConfig::ConfidenceInterval {
            confidence_level: 0.9,
            n_resamples: None,
            reference: ModelConfig::k_neighbors(3),
            seed: 2,
        },
    ];
    let suite = build_calculators(&configs, &train, &test.x, &EvaluationOptions::default());
    assert!(suite.failures.is_empty(), "{:?}", suite.failures);
    for calculator in &suite.calculators {
        let result = calculator.trust_scores(&test.x, &y_proba, &primary).unwrap();
        assert!(result.has_rows(test.n_samples()), "{}", calculator.trust_strategy_name());
    }
}

#[test]
fn timed_out_calculator_keeps_its_column_shape() {
    let train = two_blobs(40, 2.0, 8);
    let lime = LimeTrust::new(&train, 50, None, 0).unwrap();
    let x_test = train.x.select(Axis(0), &[0, 1, 2, 3]);
    let primary = ConstantClassifier::new(&[0.5, 0.5]);
    let y_proba = primary.predict_prob(&x_test).unwrap();

    let err = lime
        .trust_scores_with_budget(
            &x_test,
            &y_proba,
            &primary,
            &Budget::with_timeout(Duration::from_millis(0)),
        )
        .unwrap_err();
    match err {
        TrustError::ComputationTimeout { total, partial, .. } => {
            assert_eq!(total, 4);
            assert_eq!(partial.len(), 4);
        }
        other => panic!("expected a timeout, got {:?}", other),
    }

    // The same calculator still works afterwards.
    let result = lime.trust_scores(&x_test, &y_proba, &primary).unwrap();
    assert!(result.has_rows(4));
}

#[test]
fn cancelled_lime_keeps_the_rows_it_finished() {
    let train = two_blobs(40, 2.0, 8);
    let lime = LimeTrust::new(&train, 20, None, 0).unwrap();
    let x_test = train.x.select(Axis(0), &[0, 1, 2, 3, 4, 5]);
    let y_proba = constant_proba(6, &[0.5, 0.5]);

    let flag = Arc::new(AtomicBool::new(false));
    // LIME queries the classifier once per row
    let primary = CancellingClassifier::new(&[0.5, 0.5], 3, flag.clone());
    let budget = Budget::unbounded().with_cancel_flag(flag);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let err = pool
        .install(|| lime.trust_scores_with_budget(&x_test, &y_proba, &primary, &budget))
        .unwrap_err();

    match err {
        TrustError::ComputationTimeout { completed, total, partial } => {
            assert_eq!(completed, 3);
            assert_eq!(total, 6);
            assert_eq!(partial.len(), 6);
            assert!(partial[..3].iter().all(|s| *s == Some(1.0)));
            assert!(partial[3..].iter().all(Option::is_none));
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
}

#[test]
fn broken_delegate_is_a_training_error() {
    let train = two_blobs(10, 2.0, 0);
    let err = ExternalTrust::new(Box::new(BrokenClassifier), &train, 2)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Training);
}

#[test]
fn unfitted_primary_is_reported_as_not_fitted() {
    let train = two_blobs(20, 2.0, 0);
    let lime = LimeTrust::new(&train, 10, None, 0).unwrap();
    let x_test = train.x.select(Axis(0), &[0, 1]);
    let y_proba = constant_proba(2, &[0.5, 0.5]);
    let err = lime
        .trust_scores(&x_test, &y_proba, &NaiveBayesClassifier::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFitted);
}
