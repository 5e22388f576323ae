use snl_core::errors::{ErrorInfo, SnlError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("expected", 3)
        .with_context("reason", "example")
}

#[test]
fn dimension_error_surface() {
    let err = SnlError::Dimension(sample_info("dimension-mismatch", "prior vs data"));
    assert_eq!(err.code(), "dimension-mismatch");
    assert_eq!(err.info().context.get("expected").map(String::as_str), Some("3"));
}

#[test]
fn split_error_surface() {
    let err = SnlError::Split(sample_info("degenerate-split", "empty validation set"));
    assert_eq!(err.info().code, "degenerate-split");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn mcmc_error_surface() {
    let err = SnlError::Mcmc(sample_info("unknown-mcmc-method", "bogus").with_hint("use nuts"));
    assert_eq!(err.code(), "unknown-mcmc-method");
    let rendered = err.to_string();
    assert!(rendered.starts_with("mcmc error: bogus (code: unknown-mcmc-method)"));
    assert!(rendered.ends_with("| hint: use nuts"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = SnlError::NonFinite(ErrorInfo::new("non-finite-loss", "loss is NaN"));
    let value = serde_json::to_value(&err).unwrap();
    assert_eq!(value["family"], "NonFinite");
    assert_eq!(value["detail"]["code"], "non-finite-loss");
    let back: SnlError = serde_json::from_value(value).unwrap();
    assert_eq!(back, err);
}
