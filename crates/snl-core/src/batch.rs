//! Helpers for row-major batches of parameter and observation vectors.
//!
//! A batch is a `DMatrix<f64>` with one example per row.

use nalgebra::DMatrix;

use crate::errors::{ErrorInfo, SnlError};

/// Builds a single-row batch from a flat vector.
pub fn atleast_2d(values: &[f64]) -> DMatrix<f64> {
    DMatrix::from_row_slice(1, values.len(), values)
}

/// Flattens any vector-shaped matrix (`1 × d` or `d × 1`) into a single row.
pub fn as_row(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    DMatrix::from_iterator(1, matrix.len(), matrix.iter().copied())
}

/// Builds a batch from owned rows, checking that every row has `ncols` entries.
pub fn from_rows(rows: &[Vec<f64>], ncols: usize) -> Result<DMatrix<f64>, SnlError> {
    let mut data = Vec::with_capacity(rows.len() * ncols);
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != ncols {
            return Err(SnlError::Dimension(
                ErrorInfo::new("ragged-rows", "row length does not match batch width")
                    .with_context("row", idx)
                    .with_context("expected", ncols)
                    .with_context("actual", row.len()),
            ));
        }
        data.extend_from_slice(row);
    }
    Ok(DMatrix::from_row_slice(rows.len(), ncols, &data))
}

/// Returns the rows of a batch as owned vectors.
pub fn to_rows(batch: &DMatrix<f64>) -> Vec<Vec<f64>> {
    batch
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Stacks batches vertically. All blocks must share a column count.
pub fn concat_rows(blocks: &[DMatrix<f64>]) -> Result<DMatrix<f64>, SnlError> {
    let Some(first) = blocks.first() else {
        return Ok(DMatrix::zeros(0, 0));
    };
    let ncols = first.ncols();
    let total: usize = blocks.iter().map(|block| block.nrows()).sum();
    let mut out = DMatrix::zeros(total, ncols);
    let mut offset = 0;
    for (idx, block) in blocks.iter().enumerate() {
        if block.ncols() != ncols {
            return Err(SnlError::Dimension(
                ErrorInfo::new("concat-width", "cannot stack batches of different widths")
                    .with_context("block", idx)
                    .with_context("expected", ncols)
                    .with_context("actual", block.ncols()),
            ));
        }
        out.rows_mut(offset, block.nrows()).copy_from(block);
        offset += block.nrows();
    }
    Ok(out)
}

/// Gathers the given rows of a batch in order.
pub fn select_rows(batch: &DMatrix<f64>, indices: &[usize]) -> DMatrix<f64> {
    batch.select_rows(indices.iter())
}

/// Broadcasts a single-row context to `nrows` rows, or checks that it already has them.
pub fn broadcast_rows(context: &DMatrix<f64>, nrows: usize) -> Result<DMatrix<f64>, SnlError> {
    match context.nrows() {
        n if n == nrows => Ok(context.clone()),
        1 => Ok(DMatrix::from_fn(nrows, context.ncols(), |_, col| {
            context[(0, col)]
        })),
        n => Err(SnlError::Dimension(
            ErrorInfo::new("context-rows", "context must have one row or one row per input")
                .with_context("inputs", nrows)
                .with_context("context", n),
        )),
    }
}

