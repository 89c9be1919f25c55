use std::ops::AddAssign;

use anyhow::bail;
use nalgebra_sparse::CsrMatrix;
use ndarray::Array2;
use num_traits::{PrimInt, Unsigned, Zero};

use crate::error::PreprocessError;
use crate::NumericOps;

use super::MatrixNonZero;

// Explicitly stored zeros are skipped, so the counts match the dense implementation.
impl<M: NumericOps> MatrixNonZero for CsrMatrix<M> {
    fn nonzero_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: PrimInt + Unsigned + Zero + AddAssign,
    {
        let mut result = vec![T::zero(); self.ncols()];
        for (&col_index, value) in self.col_indices().iter().zip(self.values()) {
            if !value.is_zero() {
                result[col_index] += T::one();
            }
        }
        Ok(result)
    }
}

/// Densifies a CSR matrix into an `f64` ndarray, rejecting NaN and infinities.
pub fn csr_to_dense<M: NumericOps>(matrix: &CsrMatrix<M>) -> anyhow::Result<Array2<f64>> {
    let mut dense = Array2::<f64>::zeros((matrix.nrows(), matrix.ncols()));
    for (row_idx, row) in matrix.row_iter().enumerate() {
        for (&col_idx, &value) in row.col_indices().iter().zip(row.values()) {
            let value = <f64 as num_traits::NumCast>::from(value).ok_or(
                PreprocessError::NumericConversion {
                    row: row_idx,
                    col: col_idx,
                },
            )?;
            if !value.is_finite() {
                bail!(PreprocessError::NonFinite {
                    row: row_idx,
                    col: col_idx,
                });
            }
            dense[[row_idx, col_idx]] = value;
        }
    }
    Ok(dense)
}
