use proptest::prelude::*;
use snl_core::errors::ErrorInfo;
use snl_core::SnlError;
use snl_mcmc::gradient::central_difference;

fn quadratic(x: &[f64]) -> Result<f64, SnlError> {
    Ok(-0.5 * (x[0] - 1.0).powi(2) - 2.0 * (x[1] + 0.5).powi(2) + 0.3 * x[0] * x[1])
}

#[test]
fn matches_the_analytic_gradient_of_a_quadratic() {
    let x = [0.4, -1.3];
    let gradient = central_difference(&mut quadratic, &x, 1e-5).unwrap();
    let expected = [-(x[0] - 1.0) + 0.3 * x[1], -4.0 * (x[1] + 0.5) + 0.3 * x[0]];
    for (got, want) in gradient.iter().zip(expected) {
        assert!((got - want).abs() < 1e-6, "{got} vs {want}");
    }
}

#[test]
fn first_target_error_is_returned_and_stops_evaluation() {
    let mut calls = 0;
    let mut failing = |_: &[f64]| -> Result<f64, SnlError> {
        calls += 1;
        Err(SnlError::Simulation(ErrorInfo::new("target-crashed", "boom")))
    };
    let err = central_difference(&mut failing, &[0.0, 0.0, 0.0], 1e-5).unwrap_err();
    assert_eq!(err.code(), "target-crashed");
    assert_eq!(calls, 1);
}

#[test]
fn non_finite_targets_yield_non_finite_gradients() {
    let mut outside = |_: &[f64]| -> Result<f64, SnlError> { Ok(f64::NEG_INFINITY) };
    let gradient = central_difference(&mut outside, &[0.0], 1e-5).unwrap();
    assert!(!gradient[0].is_finite());
}

proptest! {
    #[test]
    fn linear_targets_have_constant_gradients(
        a in -3.0f64..3.0,
        b in -3.0f64..3.0,
        x in -10.0f64..10.0,
        y in -10.0f64..10.0,
    ) {
        let mut linear = |p: &[f64]| -> Result<f64, SnlError> { Ok(a * p[0] + b * p[1]) };
        let gradient = central_difference(&mut linear, &[x, y], 1e-4).unwrap();
        prop_assert!((gradient[0] - a).abs() < 1e-6);
        prop_assert!((gradient[1] - b).abs() < 1e-6);
    }
}
