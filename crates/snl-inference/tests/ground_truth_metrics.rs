mod common;

use common::{quick_config, ShiftedGaussian};
use nalgebra::DMatrix;
use snl_core::batch::atleast_2d;
use snl_inference::{
    median_pairwise_distance, unbiased_mmd_squared, DiagonalGaussian, GroundTruth, Snl, MMDS,
    NEGATIVE_LOG_PROBS_TRUE_PARAMETERS,
};

fn column(values: impl IntoIterator<Item = f64>) -> DMatrix<f64> {
    let values: Vec<f64> = values.into_iter().collect();
    DMatrix::from_column_slice(values.len(), 1, &values)
}

#[test]
fn median_distance_pools_both_sample_sets() {
    let x = column([0.0, 1.0]);
    let y = column([3.0]);
    // Pairwise distances 1, 3, 2.
    assert_eq!(median_pairwise_distance(&x, &y), 2.0);
    let same = column([0.5, 0.5]);
    assert_eq!(median_pairwise_distance(&same, &same), 1.0);
}

#[test]
fn mmd_separates_shifted_samples() {
    let x = column((0..20).map(|i| i as f64 / 20.0));
    let nearby = column((0..20).map(|i| i as f64 / 20.0 + 0.025));
    let shifted = column((0..20).map(|i| i as f64 / 20.0 + 3.0));

    let close = unbiased_mmd_squared(&x, &nearby).unwrap();
    let far = unbiased_mmd_squared(&x, &shifted).unwrap();
    assert!(close.abs() < 0.1, "close = {close}");
    assert!(far > 0.8, "far = {far}");
}

#[test]
fn mmd_needs_two_samples_per_side() {
    let x = column([0.0, 1.0]);
    let err = unbiased_mmd_squared(&x, &column([0.0])).unwrap_err();
    assert_eq!(err.code(), "mmd-sample-size");

    let wide = DMatrix::zeros(3, 2);
    let err = unbiased_mmd_squared(&x, &wide).unwrap_err();
    assert_eq!(err.code(), "dimension-mismatch");
}

#[test]
fn ground_truth_width_is_checked_when_attached() {
    let snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &[0.2, 0.1],
        quick_config(5),
        None,
    )
    .unwrap();
    let err = snl
        .with_ground_truth(GroundTruth::parameters_only(vec![0.0; 3]))
        .err()
        .unwrap();
    assert_eq!(err.code(), "dimension-mismatch");
}

#[test]
fn too_few_posterior_samples_for_the_mmd_are_rejected() {
    let truth = GroundTruth {
        true_parameters: vec![0.0, 0.0],
        reference_samples: Some(DMatrix::zeros(10, 2)),
        num_posterior_samples: 1,
    };
    assert_eq!(truth.validate(2).unwrap_err().code(), "mmd-sample-size");
}

#[test]
fn rounds_record_true_parameter_density_and_mmd() {
    let observed = [0.4, -0.3];
    let reference = DMatrix::from_fn(40, 2, |i, j| observed[j] + 0.05 * (i as f64 - 20.0) / 20.0);
    let truth = GroundTruth {
        true_parameters: observed.to_vec(),
        reference_samples: Some(reference),
        num_posterior_samples: 30,
    };
    let mut snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &observed,
        quick_config(6),
        None,
    )
    .unwrap()
    .with_ground_truth(truth)
    .unwrap();
    snl.run(2, 60).unwrap();

    let summary = snl.summary();
    let nll = summary.get(NEGATIVE_LOG_PROBS_TRUE_PARAMETERS).unwrap();
    let mmds = summary.get(MMDS).unwrap();
    assert_eq!(nll.len(), 2);
    assert_eq!(mmds.len(), 2);
    assert!(nll.iter().chain(mmds).all(|value| value.is_finite()));

    let expected = -snl
        .posterior()
        .unnormalized_log_prob(&atleast_2d(&observed))
        .unwrap()[0];
    assert_eq!(summary.last(NEGATIVE_LOG_PROBS_TRUE_PARAMETERS), Some(expected));
}

#[test]
fn parameters_only_truth_skips_the_mmd() {
    let mut snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &[0.2, 0.1],
        quick_config(7),
        None,
    )
    .unwrap()
    .with_ground_truth(GroundTruth::parameters_only(vec![0.2, 0.1]))
    .unwrap();
    snl.run(1, 40).unwrap();
    assert!(snl.summary().get(MMDS).is_none());
    assert_eq!(
        snl.summary().get(NEGATIVE_LOG_PROBS_TRUE_PARAMETERS).map(<[f64]>::len),
        Some(1)
    );
}
