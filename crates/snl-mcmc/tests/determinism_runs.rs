use snl_core::{RngHandle, SnlError};
use snl_mcmc::{sample_flat, sample_structured, McmcConfig, McmcMethod, Sites};

fn banana(x: &[f64]) -> Result<f64, SnlError> {
    Ok(-0.5 * x[0].powi(2) - 0.5 * (x[1] - x[0].powi(2)).powi(2))
}

#[test]
fn repeated_flat_runs_with_same_seed_match() {
    let config = McmcConfig::default();
    let a = sample_flat(&config, banana, &[0.1, 0.1], 50, &mut RngHandle::from_seed(2024)).unwrap();
    let b = sample_flat(&config, banana, &[0.1, 0.1], 50, &mut RngHandle::from_seed(2024)).unwrap();
    assert_eq!(a.samples, b.samples);
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn repeated_nuts_runs_with_same_seed_match() {
    let mut config = McmcConfig::default();
    config.warmup_steps = 20;
    let potential = |sites: &Sites| -> Result<f64, SnlError> {
        let values: Vec<f64> = sites["theta"].iter().copied().collect();
        Ok(-banana(&values)?)
    };
    let run = |seed| {
        sample_structured(
            McmcMethod::Nuts,
            &config,
            "theta",
            potential,
            &[0.1, 0.1],
            30,
            &mut RngHandle::from_seed(seed),
        )
        .unwrap()
    };
    assert_eq!(run(7).samples, run(7).samples);
    assert_ne!(run(7).samples, run(8).samples);
}
