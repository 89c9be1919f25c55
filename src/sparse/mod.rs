use std::ops::AddAssign;

use num_traits::{PrimInt, Unsigned, Zero};

pub mod csr;

/// Counts of stored non-zero entries per column.
///
/// For the accessibility modality the column counts are the per-feature document frequencies.
pub trait MatrixNonZero {
    fn nonzero_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: PrimInt + Unsigned + Zero + AddAssign;
}
