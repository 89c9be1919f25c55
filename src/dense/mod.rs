use std::ops::AddAssign;

use anyhow::{anyhow, bail};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2};
use nshare::{IntoNalgebra, IntoNdarray2};
use num_traits::{NumCast, PrimInt, Unsigned, Zero};
use rayon::prelude::*;

use crate::error::PreprocessError;
use crate::sparse::MatrixNonZero;
use crate::utils::{FeatureScaling, Standardize};
use crate::NumericOps;

impl<S, M> MatrixNonZero for ArrayBase<S, Ix2>
where
    S: Data<Elem = M>,
    M: NumericOps,
{
    fn nonzero_col<T>(&self) -> anyhow::Result<Vec<T>>
    where
        T: PrimInt + Unsigned + Zero + AddAssign,
    {
        let counts: Vec<usize> = self
            .axis_iter(Axis(1))
            .into_par_iter()
            .map(|col| col.iter().filter(|v| !v.is_zero()).count())
            .collect();
        convert_counts(counts)
    }
}

fn convert_counts<T>(counts: Vec<usize>) -> anyhow::Result<Vec<T>>
where
    T: PrimInt + Unsigned + Zero + AddAssign,
{
    counts
        .into_iter()
        .map(|count| T::from(count).ok_or_else(|| anyhow!("Failed to convert to target type")))
        .collect()
}

impl Standardize for Array2<f64> {
    fn standardize(&mut self) -> anyhow::Result<FeatureScaling> {
        let (rows, cols) = self.dim();
        if rows == 0 || cols == 0 {
            bail!(PreprocessError::EmptyMatrix { rows, cols });
        }
        let n = rows as f64;

        let stats: Vec<(f64, f64)> = self
            .axis_iter_mut(Axis(1))
            .into_par_iter()
            .map(|mut col| {
                let mean = col.sum() / n;
                let var = col.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
                // constant features are only centred
                let scale = if is_constant_feature(var, mean, n) {
                    1.0
                } else {
                    var.sqrt()
                };
                col.mapv_inplace(|v| (v - mean) / scale);
                (mean, scale)
            })
            .collect();

        let (mean, scale): (Vec<f64>, Vec<f64>) = stats.into_iter().unzip();
        Ok(FeatureScaling {
            mean: Array1::from(mean),
            scale: Array1::from(scale),
        })
    }
}

/// Variance below what accumulated rounding of the mean can produce.
fn is_constant_feature(var: f64, mean: f64, n: f64) -> bool {
    let bound = n * f64::EPSILON * var + (n * mean * f64::EPSILON).powi(2);
    var <= bound
}

/// Converts any numeric matrix into the `f64` working representation.
///
/// NaN and infinities are rejected with [`PreprocessError::NonFinite`].
pub fn to_f64<S, T>(x: &ArrayBase<S, Ix2>) -> anyhow::Result<Array2<f64>>
where
    S: Data<Elem = T>,
    T: NumericOps,
{
    let mut out = Array2::<f64>::zeros(x.dim());
    for ((row, col), &value) in x.indexed_iter() {
        let value = <f64 as NumCast>::from(value)
            .ok_or(PreprocessError::NumericConversion { row, col })?;
        if !value.is_finite() {
            bail!(PreprocessError::NonFinite { row, col });
        }
        out[[row, col]] = value;
    }
    Ok(out)
}

/// Narrows the working representation to the `f32` storage precision.
pub fn to_f32(x: ArrayView2<f64>) -> Array2<f32> {
    x.mapv(|v| v as f32)
}

pub(crate) fn to_nalgebra(x: ArrayView2<f64>) -> DMatrix<f64> {
    x.as_standard_layout().into_owned().into_nalgebra()
}

pub(crate) fn from_nalgebra(m: DMatrix<f64>) -> Array2<f64> {
    m.into_ndarray2().into_owned()
}
