mod common;

use common::{quick_config, BrokenSimulator, RecordingPrior, ShiftedGaussian};
use snl_core::{Prior, RngHandle};
use snl_inference::{
    AffineAutoregressive, DiagonalGaussian, Proposal, SimulationBatchSize, Snl,
    BEST_VALIDATION_LOG_PROBS, EPOCHS, MCMC_TIMES, MEDIAN_OBSERVATION_DISTANCES,
    NEURAL_NET_FIT_TIMES,
};

#[test]
fn proposal_switches_to_posterior_at_round_one() {
    assert_eq!(Proposal::for_round(0), Proposal::Prior);
    assert_eq!(Proposal::for_round(1), Proposal::Posterior);
    assert_eq!(Proposal::for_round(7), Proposal::Posterior);
}

#[test]
fn prior_feeds_round_zero_and_posterior_feeds_later_rounds() {
    let prior = RecordingPrior::new(2);
    let requests = prior.requests.clone();
    let mut config = quick_config(1);
    config.simulation_batch_size = SimulationBatchSize::All;
    let mut snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        prior,
        &[0.5, -0.5],
        config,
        None,
    )
    .unwrap();

    snl.run(1, 60).unwrap();
    assert_eq!(*requests.borrow(), vec![60]);

    // The next call continues the run; the prior only seeds the MCMC chain.
    snl.run(1, 60).unwrap();
    assert_eq!(*requests.borrow(), vec![60, 1]);
    assert_eq!(snl.rounds_completed(), 2);
}

#[test]
fn every_round_adds_exactly_the_requested_simulations() {
    let mut snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &[0.2, 0.1],
        quick_config(2),
        None,
    )
    .unwrap();
    snl.run(3, 40).unwrap();

    let bank = snl.bank();
    assert_eq!(bank.parameters().len(), bank.observations().len());
    assert_eq!(bank.round_sizes(), vec![40, 40, 40]);

    let summary = snl.summary();
    for metric in [
        EPOCHS,
        BEST_VALIDATION_LOG_PROBS,
        NEURAL_NET_FIT_TIMES,
        MCMC_TIMES,
        MEDIAN_OBSERVATION_DISTANCES,
    ] {
        assert_eq!(summary.get(metric).map(<[f64]>::len), Some(3), "{metric}");
    }
    assert_eq!(summary.get(MCMC_TIMES).unwrap()[0], 0.0);
    assert!(summary.get(EPOCHS).unwrap().iter().all(|&e| e >= 5.0));
}

#[test]
fn learned_posterior_concentrates_near_observation() {
    let mut config = quick_config(3);
    config.training.batch_size = 50;
    config.training.stop_after_epochs = 10;
    let observed = [0.8, -0.6];
    let mut snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &observed,
        config,
        None,
    )
    .unwrap();
    let posterior = snl.run(2, 300).unwrap();
    let samples = posterior.sample(300, &mut RngHandle::from_seed(30)).unwrap();
    assert_eq!(samples.shape(), (300, 2));
    for (col, target) in observed.iter().enumerate() {
        let mean = samples.column(col).mean();
        assert!((mean - target).abs() < 0.5, "column {col} mean {mean}");
    }
}

#[test]
fn same_seed_reproduces_the_bank() {
    let build = || {
        let mut snl = Snl::with_default_estimator(
            ShiftedGaussian { dim: 2, noise: 0.3 },
            DiagonalGaussian::standard(2),
            &[0.0, 0.0],
            quick_config(4),
            None,
        )
        .unwrap();
        snl.run(2, 30).unwrap();
        snl.bank().clone()
    };
    assert_eq!(build(), build());
}

#[test]
fn zero_simulations_per_round_is_rejected() {
    let mut snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &[0.0, 0.0],
        quick_config(5),
        None,
    )
    .unwrap();
    assert_eq!(snl.run(1, 0).unwrap_err().code(), "empty-round");
    assert_eq!(snl.rounds_completed(), 0);
}

#[test]
fn construction_checks_dimensions() {
    let simulator = || ShiftedGaussian { dim: 2, noise: 0.3 };
    let err = Snl::with_default_estimator(
        simulator(),
        DiagonalGaussian::standard(3),
        &[0.0, 0.0],
        quick_config(6),
        None,
    )
    .err()
    .unwrap();
    assert_eq!(err.code(), "dimension-mismatch");
    assert_eq!(err.info().context.get("what").map(String::as_str), Some("prior"));

    let err = Snl::with_default_estimator(
        simulator(),
        DiagonalGaussian::standard(2),
        &[0.0, 0.0, 0.0],
        quick_config(6),
        None,
    )
    .err()
    .unwrap();
    assert_eq!(err.code(), "dimension-mismatch");

    let err = Snl::with_default_estimator(
        simulator(),
        DiagonalGaussian::standard(2),
        &[],
        quick_config(6),
        None,
    )
    .err()
    .unwrap();
    assert_eq!(err.code(), "empty-observation");

    let err = Snl::new(
        simulator(),
        DiagonalGaussian::standard(2),
        &[0.0, 0.0],
        AffineAutoregressive::new(2, 5),
        quick_config(6),
        None,
    )
    .err()
    .unwrap();
    assert_eq!(
        err.info().context.get("what").map(String::as_str),
        Some("estimator context")
    );
}

#[test]
fn simulator_failures_abort_the_round() {
    let mut snl = Snl::with_default_estimator(
        BrokenSimulator,
        DiagonalGaussian::standard(2),
        &[0.0, 0.0],
        quick_config(7),
        None,
    )
    .unwrap();
    assert_eq!(snl.run(2, 10).unwrap_err().code(), "simulator-crashed");
    assert_eq!(snl.rounds_completed(), 0);
    assert!(snl.bank().is_empty());
}

#[test]
fn structured_sampler_drives_later_rounds() {
    let mut config = quick_config(8);
    config.mcmc_method = snl_mcmc::McmcMethod::Hmc;
    config.mcmc.hmc.num_steps = 5;
    let mut snl = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &[0.3, 0.3],
        config,
        None,
    )
    .unwrap();
    snl.run(2, 40).unwrap();
    assert_eq!(snl.bank().num_examples(), 80);
    let posterior = snl.into_posterior();
    assert_eq!(posterior.prior().dim(), 2);
}

#[test]
fn zero_simulation_batch_size_is_rejected_at_construction() {
    let mut config = quick_config(4);
    config.simulation_batch_size = SimulationBatchSize::Fixed(0);
    let result = Snl::with_default_estimator(
        ShiftedGaussian { dim: 2, noise: 0.3 },
        DiagonalGaussian::standard(2),
        &[0.5, -0.5],
        config,
        None,
    );
    assert_eq!(
        result.err().unwrap().code(),
        "invalid-simulation-batch-size"
    );
}
