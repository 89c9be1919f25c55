//! # Paired cell datasets
//!
//! A paired dataset holds two cell-aligned matrices, chromatin accessibility and gene
//! expression, and hands them out one cell at a time (or in batches through [`BatchLoader`]).
//! Row `i` of both matrices always describes the same cell.
//!
//! Two implementations share the [`CellDataset`] contract:
//! - [`PairedCellDataset`]: real data read from two tables, optionally reduced with PCA / LSI
//! - [`SyntheticPairedDataset`]: uniform random matrices for exercising consumers without data

use anyhow::bail;
use ndarray::{ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix0};

use crate::error::PreprocessError;

mod batch;
mod paired;
mod synthetic;

pub use batch::{BatchLoader, PairedBatch};
pub use paired::{PairedCellDataset, PairedDatasetConfig};
pub use synthetic::{SyntheticConfig, SyntheticPairedDataset};

/// One cell: its accessibility row, its expression row and the index it was fetched with.
///
/// The two rows usually differ in length since they live in different feature spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedSample<'a> {
    pub accessibility: ArrayView1<'a, f32>,
    pub expression: ArrayView1<'a, f32>,
    pub index: usize,
}

/// Index-based random access over cell-aligned accessibility and expression matrices.
pub trait CellDataset {
    fn accessibility(&self) -> ArrayView2<'_, f32>;

    fn expression(&self) -> ArrayView2<'_, f32>;

    /// Number of cells.
    fn len(&self) -> usize {
        self.accessibility().nrows()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sample(&self, index: usize) -> anyhow::Result<PairedSample<'_>> {
        let len = self.len();
        if index >= len {
            bail!(PreprocessError::IndexOutOfBounds {
                index: index as i128,
                len,
            });
        }
        Ok(PairedSample {
            accessibility: self.accessibility().index_axis_move(Axis(0), index),
            expression: self.expression().index_axis_move(Axis(0), index),
            index,
        })
    }

    /// Fetches a cell by any supported index form (see [`SampleIndex`]).
    fn get<I: SampleIndex>(&self, index: I) -> anyhow::Result<PairedSample<'_>>
    where
        Self: Sized,
    {
        let index = index.resolve(self.len())?;
        self.sample(index)
    }
}

/// Index forms accepted by [`CellDataset::get`].
///
/// Plain integers of any width and 0-dimensional arrays wrapping one are normalized to a
/// `usize`. Negative values are out of bounds; there is no wrap-around from the end.
pub trait SampleIndex {
    fn resolve(&self, len: usize) -> anyhow::Result<usize>;
}

fn bounds_checked(index: i128, len: usize) -> anyhow::Result<usize> {
    if index < 0 || index >= len as i128 {
        bail!(PreprocessError::IndexOutOfBounds { index, len });
    }
    Ok(index as usize)
}

macro_rules! impl_sample_index {
    ($($t:ty),*) => {$(
        impl SampleIndex for $t {
            fn resolve(&self, len: usize) -> anyhow::Result<usize> {
                bounds_checked(*self as i128, len)
            }
        }
    )*};
}

impl_sample_index!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl<S, A> SampleIndex for ArrayBase<S, Ix0>
where
    S: Data<Elem = A>,
    A: SampleIndex,
{
    fn resolve(&self, len: usize) -> anyhow::Result<usize> {
        self[()].resolve(len)
    }
}

impl<T: SampleIndex + ?Sized> SampleIndex for &T {
    fn resolve(&self, len: usize) -> anyhow::Result<usize> {
        (**self).resolve(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr0, Array2};

    struct Fixed {
        accessibility: Array2<f32>,
        expression: Array2<f32>,
    }

    impl CellDataset for Fixed {
        fn accessibility(&self) -> ArrayView2<'_, f32> {
            self.accessibility.view()
        }

        fn expression(&self) -> ArrayView2<'_, f32> {
            self.expression.view()
        }
    }

    fn fixed() -> Fixed {
        Fixed {
            accessibility: Array2::from_shape_fn((4, 3), |(i, j)| (i * 10 + j) as f32),
            expression: Array2::from_shape_fn((4, 2), |(i, j)| -((i * 10 + j) as f32)),
        }
    }

    fn out_of_bounds(err: anyhow::Error) -> Option<(i128, usize)> {
        match err.downcast_ref::<PreprocessError>() {
            Some(PreprocessError::IndexOutOfBounds { index, len }) => Some((*index, *len)),
            _ => None,
        }
    }

    #[test]
    fn test_get_rows_and_index() {
        let ds = fixed();
        assert_eq!(ds.len(), 4);
        assert!(!ds.is_empty());

        let sample = ds.get(2usize).unwrap();
        assert_eq!(sample.index, 2);
        assert_eq!(sample.accessibility.to_vec(), vec![20.0, 21.0, 22.0]);
        assert_eq!(sample.expression.to_vec(), vec![-20.0, -21.0]);
    }

    #[test]
    fn test_index_forms_agree() {
        let ds = fixed();
        let plain = ds.get(1usize).unwrap();
        assert_eq!(ds.get(1i32).unwrap(), plain);
        assert_eq!(ds.get(1u8).unwrap(), plain);
        assert_eq!(ds.get(arr0(1i64)).unwrap(), plain);
        let wrapped = arr0(1usize);
        assert_eq!(ds.get(wrapped.view()).unwrap(), plain);
        assert_eq!(ds.get(&1u64).unwrap(), plain);
    }

    #[test]
    fn test_out_of_bounds() {
        let ds = fixed();
        assert_eq!(out_of_bounds(ds.get(4usize).unwrap_err()), Some((4, 4)));
        assert_eq!(out_of_bounds(ds.get(-1i64).unwrap_err()), Some((-1, 4)));
        assert_eq!(out_of_bounds(ds.get(arr0(-3i32)).unwrap_err()), Some((-3, 4)));
        assert_eq!(out_of_bounds(ds.sample(100).unwrap_err()), Some((100, 4)));
    }
}
