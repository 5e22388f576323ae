use nalgebra::DMatrix;
use proptest::prelude::*;
use snl_inference::ParameterObservationBank;

fn block(rows: usize, cols: usize, fill: f64) -> DMatrix<f64> {
    DMatrix::from_element(rows, cols, fill)
}

proptest! {
    #[test]
    fn rounds_stay_aligned(sizes in proptest::collection::vec(1usize..40, 1..8)) {
        let mut bank = ParameterObservationBank::new();
        for (round, &size) in sizes.iter().enumerate() {
            bank.append(block(size, 3, round as f64), block(size, 2, -(round as f64))).unwrap();
            prop_assert_eq!(bank.parameters().len(), bank.observations().len());
            prop_assert_eq!(bank.num_rounds(), round + 1);
        }
        prop_assert_eq!(bank.round_sizes(), sizes.clone());
        let (params, obs) = bank.pooled().unwrap();
        let total: usize = sizes.iter().sum();
        prop_assert_eq!(params.shape(), (total, 3));
        prop_assert_eq!(obs.shape(), (total, 2));
        prop_assert_eq!(bank.num_examples(), total);
        // The last round's rows come last in the pooled view.
        let last = sizes.len() - 1;
        prop_assert_eq!(params[(total - 1, 0)], last as f64);
    }
}

#[test]
fn misaligned_round_is_rejected() {
    let mut bank = ParameterObservationBank::new();
    let err = bank.append(block(4, 2, 0.0), block(3, 2, 0.0)).unwrap_err();
    assert_eq!(err.code(), "bank-row-mismatch");
    assert!(bank.is_empty());
}

#[test]
fn width_must_match_first_round() {
    let mut bank = ParameterObservationBank::new();
    bank.append(block(4, 2, 0.0), block(4, 1, 0.0)).unwrap();
    let err = bank.append(block(4, 3, 0.0), block(4, 1, 0.0)).unwrap_err();
    assert_eq!(err.code(), "bank-width-mismatch");
    assert_eq!(bank.num_rounds(), 1);
}

#[test]
fn empty_round_is_rejected() {
    let mut bank = ParameterObservationBank::new();
    let err = bank.append(block(0, 2, 0.0), block(0, 1, 0.0)).unwrap_err();
    assert_eq!(err.code(), "bank-empty-round");
}

#[test]
fn bank_survives_json_and_revalidates() {
    let mut bank = ParameterObservationBank::new();
    bank.append(block(2, 2, 1.0), block(2, 1, 2.0)).unwrap();
    bank.append(block(3, 2, 3.0), block(3, 1, 4.0)).unwrap();
    let json = serde_json::to_string(&bank).unwrap();
    let restored: ParameterObservationBank = serde_json::from_str(&json).unwrap();
    restored.validate().unwrap();
    assert_eq!(restored, bank);
}
