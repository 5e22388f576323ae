use nalgebra::DMatrix;
use proptest::prelude::*;
use snl_core::batch::{as_row, atleast_2d, broadcast_rows, concat_rows, from_rows, select_rows, to_rows};

#[test]
fn vectors_become_single_rows() {
    let row = atleast_2d(&[1.0, 2.0, 3.0]);
    assert_eq!(row.shape(), (1, 3));

    let column = DMatrix::from_column_slice(3, 1, &[1.0, 2.0, 3.0]);
    assert_eq!(as_row(&column), row);
}

#[test]
fn ragged_rows_are_rejected() {
    let err = from_rows(&[vec![1.0, 2.0], vec![3.0]], 2).unwrap_err();
    assert_eq!(err.code(), "ragged-rows");
}

#[test]
fn concat_rejects_mixed_widths() {
    let a = DMatrix::<f64>::zeros(2, 3);
    let b = DMatrix::<f64>::zeros(2, 4);
    assert_eq!(concat_rows(&[a, b]).unwrap_err().code(), "concat-width");
}

#[test]
fn broadcast_repeats_a_single_context_row() {
    let context = atleast_2d(&[0.5, -1.0]);
    let wide = broadcast_rows(&context, 4).unwrap();
    assert_eq!(wide.shape(), (4, 2));
    assert!(wide.row_iter().all(|row| row[0] == 0.5 && row[1] == -1.0));
    assert!(broadcast_rows(&DMatrix::<f64>::zeros(3, 2), 4).is_err());
}

proptest! {
    #[test]
    fn concat_then_select_recovers_blocks(sizes in proptest::collection::vec(1usize..6, 1..5), width in 1usize..4) {
        let mut next = 0.0;
        let blocks: Vec<DMatrix<f64>> = sizes
            .iter()
            .map(|&rows| {
                DMatrix::from_fn(rows, width, |_, _| {
                    next += 1.0;
                    next
                })
            })
            .collect();
        let stacked = concat_rows(&blocks).unwrap();
        prop_assert_eq!(stacked.nrows(), sizes.iter().sum::<usize>());

        let mut offset = 0;
        for block in &blocks {
            let indices: Vec<usize> = (offset..offset + block.nrows()).collect();
            prop_assert_eq!(&select_rows(&stacked, &indices), block);
            offset += block.nrows();
        }
        prop_assert_eq!(from_rows(&to_rows(&stacked), width).unwrap(), stacked);
    }
}
