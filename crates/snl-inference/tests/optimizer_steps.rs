use snl_inference::{adam, clip_grad_norm};

fn norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

#[test]
fn gradients_above_the_bound_are_rescaled_to_it() {
    let mut gradient = vec![30.0, -40.0, 0.0];
    let before = clip_grad_norm(&mut gradient, 5.0).unwrap();
    assert!((before - 50.0).abs() < 1e-9);
    assert!((norm(&gradient) - 5.0).abs() < 1e-4, "{gradient:?}");
    assert!((gradient[0] / gradient[1] + 0.75).abs() < 1e-9);
}

#[test]
fn gradients_within_the_bound_are_left_alone() {
    let original = vec![1.0, -2.0, 0.5];
    let mut gradient = original.clone();
    let before = clip_grad_norm(&mut gradient, 5.0).unwrap();
    assert!((before - norm(&original)).abs() < 1e-12);
    assert_eq!(gradient, original);
}

#[test]
fn first_adam_step_moves_each_parameter_by_the_learning_rate() {
    let learning_rate = 1e-3;
    let mut optimizer = adam(learning_rate, 5.0);
    let start = vec![0.5, -1.0, 2.0];
    let gradient = [0.3, -2.0, 0.01];
    let mut parameters = start.clone();
    optimizer.step(&mut parameters, &gradient).unwrap();
    assert_eq!(optimizer.steps(), 1);
    for ((after, before), grad) in parameters.iter().zip(&start).zip(gradient) {
        let expected = before - learning_rate * grad.signum();
        assert!((after - expected).abs() < 1e-8, "{after} vs {expected}");
    }
}

#[test]
fn clipped_first_step_still_moves_by_the_learning_rate() {
    let mut optimizer = adam(1e-2, 5.0);
    let mut parameters = vec![0.0, 0.0];
    let before = optimizer.step(&mut parameters, &[300.0, -400.0]).unwrap();
    assert!((before - 500.0).abs() < 1e-9);
    assert!((parameters[0] + 1e-2).abs() < 1e-8);
    assert!((parameters[1] - 1e-2).abs() < 1e-8);
}

#[test]
fn zero_gradient_leaves_parameters_in_place() {
    let mut optimizer = adam(1e-2, 5.0);
    let mut parameters = vec![1.5, -0.25];
    optimizer.step(&mut parameters, &[0.0, 0.0]).unwrap();
    assert_eq!(parameters, vec![1.5, -0.25]);
}

#[test]
fn repeated_steps_descend_a_quadratic() {
    let mut optimizer = adam(0.05, 5.0);
    let mut parameters = vec![2.0, -3.0];
    for _ in 0..400 {
        let gradient = parameters.clone();
        optimizer.step(&mut parameters, &gradient).unwrap();
    }
    assert_eq!(optimizer.steps(), 400);
    assert!(norm(&parameters) < 0.2, "{parameters:?}");
}
