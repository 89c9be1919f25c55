use anyhow::{anyhow, bail};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};

use crate::dense::{from_nalgebra, to_nalgebra};
use crate::error::PreprocessError;

/// Economy-size singular value decomposition `A = U · diag(S) · Vᵗ`.
///
/// For an `m x n` input, `u` is `m x r`, `s` has `r` entries and `vt` is `r x n` with
/// `r = min(m, n)`. Singular values are stored largest first.
#[derive(Debug, Clone)]
pub struct SvdResult {
    u: Array2<f64>,
    s: Array1<f64>,
    vt: Array2<f64>,
}

impl SvdResult {
    pub fn new(u: Array2<f64>, s: Array1<f64>, vt: Array2<f64>) -> anyhow::Result<Self> {
        let r = s.len();
        if u.ncols() != r || vt.nrows() != r {
            bail!(
                "Inconsistent SVD factors: U is {:?}, S has {} values, Vt is {:?}",
                u.dim(),
                r,
                vt.dim()
            );
        }
        Ok(SvdResult { u, s, vt })
    }

    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    pub fn s(&self) -> &Array1<f64> {
        &self.s
    }

    pub fn vt(&self) -> &Array2<f64> {
        &self.vt
    }

    pub fn rank(&self) -> usize {
        self.s.len()
    }

    /// Keeps the leading `k` singular triplets.
    pub fn truncate(&self, k: usize) -> SvdResult {
        let k = k.min(self.rank());
        SvdResult {
            u: self.u.slice(s![.., ..k]).to_owned(),
            s: self.s.slice(s![..k]).to_owned(),
            vt: self.vt.slice(s![..k, ..]).to_owned(),
        }
    }

    // Reconstruct the original matrix
    pub fn reconstruct(&self) -> Array2<f64> {
        let s_diag = Array2::from_diag(&self.s);
        self.u.dot(&s_diag).dot(&self.vt)
    }

    fn sort_descending(&mut self) {
        let mut order: Vec<usize> = (0..self.rank()).collect();
        order.sort_by(|&a, &b| self.s[b].total_cmp(&self.s[a]));
        if order.iter().enumerate().all(|(i, &idx)| i == idx) {
            return;
        }
        self.s = self.s.select(Axis(0), &order);
        self.u = self.u.select(Axis(1), &order);
        self.vt = self.vt.select(Axis(0), &order);
    }
}

/// Backend seam for the decompositions used by LSI and PCA.
pub trait SVDImplementation: Send + Sync {
    fn compute(&self, matrix: ArrayView2<f64>) -> anyhow::Result<SvdResult>;
}

/// Implicit-shift QR sweeps allowed per singular value when no explicit cap is set.
const ITERATIONS_PER_VALUE: usize = 30;
const MIN_ITERATIONS: usize = 100;

/// Pure-Rust SVD through `nalgebra`'s implicit-shift bidiagonal algorithm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NalgebraSVD {
    pub eps: f64,
    /// Upper bound on QR sweeps; `0` derives the bound from the matrix size.
    pub max_iterations: usize,
}

impl Default for NalgebraSVD {
    fn default() -> Self {
        Self {
            eps: f64::EPSILON,
            max_iterations: 0,
        }
    }
}

impl NalgebraSVD {
    fn iteration_cap(&self, rows: usize, cols: usize) -> usize {
        if self.max_iterations > 0 {
            self.max_iterations
        } else {
            (ITERATIONS_PER_VALUE * rows.min(cols)).max(MIN_ITERATIONS)
        }
    }
}

impl SVDImplementation for NalgebraSVD {
    fn compute(&self, matrix: ArrayView2<f64>) -> anyhow::Result<SvdResult> {
        let (rows, cols) = matrix.dim();
        if rows == 0 || cols == 0 {
            bail!(PreprocessError::EmptyMatrix { rows, cols });
        }
        // the QR sweeps never deflate on NaN
        if let Some(((row, col), _)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
            bail!(PreprocessError::NonFinite { row, col });
        }

        let svd = nalgebra::linalg::SVD::try_new(
            to_nalgebra(matrix),
            true,
            true,
            self.eps,
            self.iteration_cap(rows, cols),
        )
        .ok_or(PreprocessError::SvdNotConverged { rows, cols })?;

        let s = Array1::from_iter(svd.singular_values.iter().cloned());
        let u = svd.u.ok_or_else(|| anyhow!("SVD did not return U"))?;
        let vt = svd.v_t.ok_or_else(|| anyhow!("SVD did not return Vt"))?;

        let mut result = SvdResult::new(from_nalgebra(u), s, from_nalgebra(vt))?;
        result.sort_descending();
        log::debug!(
            "SVD of {} x {} matrix: rank {}, leading singular value {:.4}",
            rows,
            cols,
            result.rank(),
            result.s[0]
        );
        Ok(result)
    }
}

/// Resolves the sign ambiguity of an SVD so results are reproducible.
///
/// Signs are decided from the rows of `vt`; `u` is flipped with them, so `U · diag(S) · Vᵗ` is
/// unchanged.
pub fn svd_flip(u: &mut Array2<f64>, vt: &mut Array2<f64>) -> anyhow::Result<()> {
    let mut u_nalgebra = to_nalgebra(u.view());
    let mut vt_nalgebra = to_nalgebra(vt.view());
    single_svdlib::randomized::svd_flip(Some(&mut u_nalgebra), Some(&mut vt_nalgebra), false)?;

    *u = from_nalgebra(u_nalgebra);
    *vt = from_nalgebra(vt_nalgebra);
    Ok(())
}
