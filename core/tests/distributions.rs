use serde_json::json;
use std::collections::BTreeMap;
use transship_core::{
    config::SimulationConfig,
    distribution::{DistributionKind, DistributionModel},
    error::TransshipError,
    rng::RngBank,
    types::Role,
    variates::{VariateGenerator, Variates, WeightedDiscrete},
};

fn generator(descriptor: serde_json::Value) -> VariateGenerator {
    let model = DistributionModel::try_from(descriptor).unwrap();
    VariateGenerator::new(&model, &SimulationConfig::default()).unwrap()
}

#[test]
fn descriptors_parse_into_their_kind() {
    let norm = DistributionModel::try_from(json!({"distribution": "NORM", "mu": 0, "sigma": 2.5})).unwrap();
    assert_eq!(norm, DistributionModel::Norm { mu: 0.0, sigma: 2.5 });

    let disc = DistributionModel::try_from(json!({"distribution": "DISC", "values": [1, -2, 3]})).unwrap();
    assert_eq!(disc.kind(), DistributionKind::Disc);

    let weighted = DistributionModel::try_from(json!({
        "distribution": "WEIGHTED_DISCRETE",
        "prob_value_pairs": {"-1": 0.5, "2": 0.5}
    }))
    .unwrap();
    assert_eq!(weighted.kind().code(), "WEIGHTED_DISCRETE");
}

#[test]
fn unknown_kind_is_unsupported() {
    let err = DistributionModel::try_from(json!({"distribution": "POISSON", "lambda": 3})).unwrap_err();
    assert!(matches!(err, TransshipError::UnsupportedDistribution { kind } if kind == "POISSON"));
}

#[test]
fn missing_parameter_is_rejected() {
    let err = DistributionModel::try_from(json!({"distribution": "NORM", "mu": 0})).unwrap_err();
    match err {
        TransshipError::InvalidDistribution { reason } => assert!(reason.contains("sigma"), "{reason}"),
        other => panic!("unexpected error: {other}"),
    }

    let err = DistributionModel::try_from(json!({"distribution": "DISC", "values": null})).unwrap_err();
    assert!(matches!(err, TransshipError::InvalidDistribution { .. }));
}

#[test]
fn malformed_descriptor_fails_inside_a_payload() {
    let result: Result<DistributionModel, _> =
        serde_json::from_str(r#"{"distribution": "NORM", "sigma": "wide"}"#);
    let message = result.unwrap_err().to_string();
    assert!(message.contains("mu"), "{message}");
}

#[test]
fn weighted_keys_must_be_numeric() {
    let pairs = BTreeMap::from([("two".to_string(), 0.5), ("3".to_string(), 0.5)]);
    let err = WeightedDiscrete::new(&pairs, 1e-6).unwrap_err();
    match err {
        TransshipError::InvalidDistribution { reason } => assert!(reason.contains("numeric"), "{reason}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn weighted_probabilities_must_sum_to_one() {
    let pairs = BTreeMap::from([("0".to_string(), 0.5), ("1".to_string(), 0.4)]);
    assert!(WeightedDiscrete::new(&pairs, 1e-6).is_err());

    let pairs = BTreeMap::from([("0".to_string(), 0.5), ("1".to_string(), 0.5)]);
    assert!(WeightedDiscrete::new(&pairs, 1e-6).is_ok());
}

#[test]
fn every_kind_returns_exactly_sample_size_values() {
    let bank = RngBank::new(11);
    let descriptors = [
        json!({"distribution": "NORM", "mu": 0, "sigma": 4}),
        json!({"distribution": "DISC", "values": [-3, -1, 0, 0, 2, 4, 5]}),
        json!({"distribution": "WEIGHTED_DISCRETE", "prob_value_pairs": {"-1": 0.3, "0": 0.4, "2": 0.3}}),
    ];
    for descriptor in descriptors {
        let g = generator(descriptor);
        let mut rng = bank.for_product("SKU-1", Role::Origin);
        for n in [0, 1, 17, 1000] {
            assert_eq!(g.generate(12.0, n, &mut rng).unwrap().len(), n);
        }
    }
}

#[test]
fn normal_draws_are_never_negative() {
    let g = generator(json!({"distribution": "NORM", "mu": 0, "sigma": 10}));
    let mut rng = RngBank::new(3).for_product("SKU-1", Role::Destination);
    let draws = g.generate(2.0, 5_000, &mut rng).unwrap();
    assert!(draws.iter().all(|d| *d >= 0.0));
    assert!(draws.iter().all(|d| d.fract() == 0.0));
    assert!(draws.iter().any(|d| *d > 2.0));
}

#[test]
fn non_positive_sigma_is_floored() {
    let g = generator(json!({"distribution": "NORM", "mu": 0, "sigma": 0}));
    let mut rng = RngBank::new(3).for_product("SKU-1", Role::Origin);
    let draws = g.generate(7.0, 200, &mut rng).unwrap();
    assert!(draws.iter().all(|d| *d == 7.0));
}

#[test]
fn weighted_sample_mean_converges_to_expected_offset() {
    let pairs = BTreeMap::from([
        ("-2".to_string(), 0.25),
        ("0".to_string(), 0.5),
        ("3".to_string(), 0.25),
    ]);
    let weighted = WeightedDiscrete::new(&pairs, 1e-6).unwrap();
    assert!((weighted.expected_offset() - 0.25).abs() < 1e-12);

    let mut rng = RngBank::new(99).for_product("SKU-9", Role::Origin);
    let draws = weighted.generate(10.0, 40_000, &mut rng).unwrap();
    let mean = draws.iter().sum::<f64>() / draws.len() as f64;
    assert!((mean - 10.25).abs() < 0.05, "mean {mean}");
}

#[test]
fn empirical_draws_stay_within_smoothed_support() {
    let g = generator(json!({"distribution": "DISC", "values": [-2, -1, 0, 1, 2]}));
    let mut rng = RngBank::new(5).for_product("SKU-2", Role::Origin);
    let draws = g.generate(20.0, 2_000, &mut rng).unwrap();
    assert!(draws.iter().all(|d| *d >= 0.0 && d.fract() == 0.0));
    let mean = draws.iter().sum::<f64>() / draws.len() as f64;
    assert!((mean - 20.0).abs() < 1.5, "mean {mean}");
}

#[test]
fn empirical_with_zero_variance_uses_exact_values() {
    let g = generator(json!({"distribution": "DISC", "values": [3, 3, 3]}));
    let mut rng = RngBank::new(5).for_product("SKU-2", Role::Origin);
    let draws = g.generate(10.0, 100, &mut rng).unwrap();
    assert!(draws.iter().all(|d| *d == 7.0));
}

#[test]
fn empirical_generator_rejects_a_degenerate_kde_grid() {
    let model = DistributionModel::try_from(json!({"distribution": "DISC", "values": [-1, 0, 2]})).unwrap();
    for kde_grid_size in [0, 1] {
        let config = SimulationConfig { kde_grid_size, ..SimulationConfig::default() };
        let err = VariateGenerator::new(&model, &config).unwrap_err();
        match err {
            TransshipError::InvalidDistribution { reason } => assert!(reason.contains("grid"), "{reason}"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
