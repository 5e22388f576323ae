use std::cell::RefCell;

use finitediff::FiniteDiff;
use snl_core::SnlError;

/// Central finite-difference gradient of `f` at `x` with step `epsilon`.
///
/// The first error raised by `f` aborts the remaining evaluations and is
/// returned. Non-finite evaluations are passed through; callers treat a
/// non-finite gradient as a divergent trajectory.
pub fn central_difference<F>(f: &mut F, x: &[f64], epsilon: f64) -> Result<Vec<f64>, SnlError>
where
    F: FnMut(&[f64]) -> Result<f64, SnlError>,
{
    // finitediff steps by sqrt(machine epsilon); differentiate in coordinates
    // scaled so that step lands on `epsilon` in `x`.
    let scale = epsilon / f64::EPSILON.sqrt();
    let target = RefCell::new(f);
    let failure: RefCell<Option<SnlError>> = RefCell::new(None);
    let scaled_target = |u: &Vec<f64>| -> f64 {
        if failure.borrow().is_some() {
            return f64::NAN;
        }
        let point: Vec<f64> = u.iter().map(|value| value * scale).collect();
        match (*target.borrow_mut())(point.as_slice()) {
            Ok(value) => value,
            Err(err) => {
                failure.replace(Some(err));
                f64::NAN
            }
        }
    };

    let scaled: Vec<f64> = x.iter().map(|value| value / scale).collect();
    let gradient = scaled.central_diff(&scaled_target);
    if let Some(err) = failure.into_inner() {
        return Err(err);
    }
    Ok(gradient.into_iter().map(|value| value / scale).collect())
}
