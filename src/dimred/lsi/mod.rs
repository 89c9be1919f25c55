//! # Latent Semantic Indexing
//!
//! TF-IDF weighted SVD of a cell x feature count matrix, the usual first reduction for
//! chromatin accessibility data. Features play the role of terms and cells the role of
//! documents:
//!
//! 1. the matrix is transposed to feature x cell orientation,
//! 2. every feature is weighted by `ln(n_cells / document_frequency)`,
//! 3. an economy SVD `U · diag(S) · Vᵗ` of the weighted matrix is computed,
//! 4. the embedding of each cell is its row of `V_k · diag(S_k)`.
//!
//! ## Sign ambiguity
//! Each singular triplet is only defined up to a joint sign flip, so two correct runs (or two
//! SVD backends) may return embeddings whose columns differ in sign. The embedding is not
//! sign-normalized; compare results through `latent · latentᵗ` or through [`LatentSemanticIndexing::reconstruct`].
//!
//! ## Zero document frequency
//! A feature that is zero in every cell has an undefined weight (`ln(n / 0)`). Such features are
//! rejected by default; see [`ZeroFrequencyPolicy`].

use std::sync::Arc;

use anyhow::bail;
use nalgebra_sparse::CsrMatrix;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
use serde::{Deserialize, Serialize};

use crate::dense::to_f64;
use crate::dimred::resolve_components;
use crate::error::PreprocessError;
use crate::sparse::csr::csr_to_dense;
use crate::sparse::MatrixNonZero;
use crate::svd::{NalgebraSVD, SVDImplementation, SvdResult};
use crate::NumericOps;

/// What to do with features that are zero in every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroFrequencyPolicy {
    /// Fail with [`PreprocessError::ZeroFrequencyFeature`].
    #[default]
    Reject,
    /// Give the feature a weight of 0 so it contributes nothing to the embedding.
    ZeroWeight,
}

pub struct LatentSemanticIndexingBuilder<S: SVDImplementation> {
    n_components: Option<usize>,
    zero_frequency_policy: ZeroFrequencyPolicy,
    clamp_components: bool,
    svd_implementation: Arc<S>,
}

impl Default for LatentSemanticIndexingBuilder<NalgebraSVD> {
    fn default() -> Self {
        Self::new(NalgebraSVD::default())
    }
}

impl<S: SVDImplementation> LatentSemanticIndexingBuilder<S> {
    pub fn new(svd_implementation: S) -> Self {
        Self {
            n_components: None,
            zero_frequency_policy: ZeroFrequencyPolicy::default(),
            clamp_components: false,
            svd_implementation: Arc::new(svd_implementation),
        }
    }

    /// Number of latent dimensions; when unset the full reduced rank is kept.
    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    pub fn zero_frequency_policy(mut self, policy: ZeroFrequencyPolicy) -> Self {
        self.zero_frequency_policy = policy;
        self
    }

    pub fn clamp_components(mut self, clamp: bool) -> Self {
        self.clamp_components = clamp;
        self
    }

    pub fn build(self) -> LatentSemanticIndexing<S> {
        LatentSemanticIndexing {
            n_components: self.n_components,
            zero_frequency_policy: self.zero_frequency_policy,
            clamp_components: self.clamp_components,
            svd_implementation: self.svd_implementation,
            idf: None,
            svd: None,
        }
    }
}

pub struct LatentSemanticIndexing<S: SVDImplementation> {
    n_components: Option<usize>,
    zero_frequency_policy: ZeroFrequencyPolicy,
    clamp_components: bool,
    svd_implementation: Arc<S>,
    idf: Option<Array1<f64>>,
    svd: Option<SvdResult>,
}

impl<S: SVDImplementation> LatentSemanticIndexing<S> {
    /// Embeds a dense cell x feature count matrix, returning a cell x k latent matrix.
    pub fn fit_transform<D, T>(&mut self, x: &ArrayBase<D, Ix2>) -> anyhow::Result<Array2<f64>>
    where
        D: Data<Elem = T>,
        T: NumericOps,
    {
        let counts = to_f64(x)?;
        check_shape(counts.nrows(), counts.ncols())?;
        if let Some(((row, col), &value)) = counts.indexed_iter().find(|(_, v)| **v < 0.0) {
            bail!(PreprocessError::NegativeCount { row, col, value });
        }
        let document_frequency: Vec<usize> = counts.nonzero_col()?;
        self.embed(counts, &document_frequency)
    }

    /// Same as [`fit_transform`](Self::fit_transform) for counts held in CSR form.
    pub fn fit_transform_sparse<T: NumericOps>(
        &mut self,
        x: &CsrMatrix<T>,
    ) -> anyhow::Result<Array2<f64>> {
        check_shape(x.nrows(), x.ncols())?;
        let document_frequency: Vec<usize> = x.nonzero_col()?;
        let counts = csr_to_dense(x)?;
        if let Some(((row, col), &value)) = counts.indexed_iter().find(|(_, v)| **v < 0.0) {
            bail!(PreprocessError::NegativeCount { row, col, value });
        }
        self.embed(counts, &document_frequency)
    }

    fn embed(
        &mut self,
        counts: Array2<f64>,
        document_frequency: &[usize],
    ) -> anyhow::Result<Array2<f64>> {
        let (n_cells, n_features) = counts.dim();
        let k = resolve_components(
            self.n_components,
            n_cells.min(n_features),
            self.clamp_components,
        )?;

        let idf = self.idf_weights(document_frequency, n_cells)?;

        // feature x cell, each feature row scaled by its weight
        let weighted = &counts.t() * &idf.view().insert_axis(Axis(1));

        let svd = self.svd_implementation.compute(weighted.view())?.truncate(k);
        let latent = svd.vt().t().dot(&Array2::from_diag(svd.s()));

        log::debug!(
            "LSI embedded {} cells x {} features into {} dimensions",
            n_cells,
            n_features,
            k
        );

        self.idf = Some(idf);
        self.svd = Some(svd);
        Ok(latent)
    }

    fn idf_weights(
        &self,
        document_frequency: &[usize],
        n_cells: usize,
    ) -> anyhow::Result<Array1<f64>> {
        let n = n_cells as f64;
        let mut idf = Array1::zeros(document_frequency.len());
        for (feature, &df) in document_frequency.iter().enumerate() {
            idf[feature] = match (df, self.zero_frequency_policy) {
                (0, ZeroFrequencyPolicy::Reject) => {
                    bail!(PreprocessError::ZeroFrequencyFeature { feature })
                }
                (0, ZeroFrequencyPolicy::ZeroWeight) => 0.0,
                (df, _) => (n / df as f64).ln(),
            };
        }
        Ok(idf)
    }

    /// Inverse document frequency weight of every feature from the last fit.
    pub fn idf(&self) -> Option<&Array1<f64>> {
        self.idf.as_ref()
    }

    /// Retained singular values, largest first.
    pub fn singular_values(&self) -> Option<&Array1<f64>> {
        self.svd.as_ref().map(|svd| svd.s())
    }

    /// Retained left singular vectors (feature loadings), `n_features x k`.
    pub fn left_singular_vectors(&self) -> Option<&Array2<f64>> {
        self.svd.as_ref().map(|svd| svd.u())
    }

    /// Rank-k approximation of the weighted feature x cell matrix, `U_k · latentᵗ`.
    pub fn reconstruct(&self) -> anyhow::Result<Array2<f64>> {
        let svd = self.svd.as_ref().ok_or(PreprocessError::NotFitted)?;
        Ok(svd.reconstruct())
    }
}

fn check_shape(rows: usize, cols: usize) -> anyhow::Result<()> {
    if rows == 0 || cols == 0 {
        bail!(PreprocessError::EmptyMatrix { rows, cols });
    }
    Ok(())
}

/// Computes the LSI embedding of `x` (cells x features) with `k` dimensions, or the full reduced
/// rank when `k` is `None`. Features that are zero in every cell are rejected.
pub fn latent_semantic_indexing<D, T>(
    x: &ArrayBase<D, Ix2>,
    k: Option<usize>,
) -> anyhow::Result<Array2<f64>>
where
    D: Data<Elem = T>,
    T: NumericOps,
{
    let mut builder = LatentSemanticIndexingBuilder::default();
    if let Some(k) = k {
        builder = builder.n_components(k);
    }
    builder.build().fit_transform(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra_sparse::CooMatrix;
    use ndarray::array;

    fn counts_5x8() -> Array2<f64> {
        array![
            [1.0, 0.0, 3.0, 0.0, 2.0, 0.0, 1.0, 4.0],
            [0.0, 2.0, 0.0, 1.0, 0.0, 5.0, 0.0, 1.0],
            [4.0, 1.0, 0.0, 0.0, 1.0, 0.0, 2.0, 0.0],
            [0.0, 0.0, 1.0, 3.0, 0.0, 1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0, 1.0, 6.0, 0.0, 0.0, 2.0]
        ]
    }

    fn weighted_by_hand(x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows() as f64;
        let mut w = x.t().to_owned();
        for mut row in w.rows_mut() {
            let df = row.iter().filter(|&&v| v != 0.0).count() as f64;
            let idf = (n / df).ln();
            row.mapv_inplace(|v| v * idf);
        }
        w
    }

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_output_shape_with_k() {
        let latent = latent_semantic_indexing(&counts_5x8(), Some(3)).unwrap();
        assert_eq!(latent.dim(), (5, 3));
    }

    #[test]
    fn test_output_shape_full_rank() {
        let x = counts_5x8();
        let latent = latent_semantic_indexing(&x, None).unwrap();
        assert_eq!(latent.dim(), (5, 5));

        // more cells than features: rank is bounded by the feature count
        let tall = x.t().to_owned();
        let latent = latent_semantic_indexing(&tall, None).unwrap();
        assert_eq!(latent.dim(), (8, 5));
    }

    #[test]
    fn test_idf_weights() {
        let x = counts_5x8();
        let mut lsi = LatentSemanticIndexingBuilder::default().n_components(2).build();
        lsi.fit_transform(&x).unwrap();

        let idf = lsi.idf().unwrap();
        assert_eq!(idf.len(), 8);
        // feature 0 is non-zero in 3 of 5 cells
        assert_abs_diff_eq!(idf[0], (5.0f64 / 3.0).ln(), epsilon = 1e-12);
        // feature 1 in 2 of 5
        assert_abs_diff_eq!(idf[1], (5.0f64 / 2.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_gram_matrix_is_sign_invariant() {
        // latent · latentᵗ = V S² Vᵗ = Wᵗ W for the full rank, whatever signs the SVD picked
        let x = counts_5x8();
        let latent = latent_semantic_indexing(&x, None).unwrap();
        let w = weighted_by_hand(&x);
        assert_close(&latent.dot(&latent.t()), &w.t().dot(&w));
    }

    #[test]
    fn test_reconstruction() {
        let x = counts_5x8();
        let mut lsi = LatentSemanticIndexingBuilder::default().build();
        let latent = lsi.fit_transform(&x).unwrap();

        let w = weighted_by_hand(&x);
        assert_close(&lsi.reconstruct().unwrap(), &w);

        let u = lsi.left_singular_vectors().unwrap();
        assert_eq!(u.dim(), (8, 5));
        assert_close(&u.dot(&latent.t()), &w);
    }

    #[test]
    fn test_truncated_columns_match_leading_full_columns_up_to_sign() {
        let x = counts_5x8();
        let full = latent_semantic_indexing(&x, None).unwrap();
        let top = latent_semantic_indexing(&x, Some(2)).unwrap();
        for j in 0..2 {
            let sign = if full[[0, j]] * top[[0, j]] < 0.0 { -1.0 } else { 1.0 };
            for i in 0..5 {
                assert_abs_diff_eq!(top[[i, j]], sign * full[[i, j]], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_integer_counts() {
        let x = counts_5x8().mapv(|v| v as u32);
        let latent = latent_semantic_indexing(&x, Some(3)).unwrap();
        let reference = latent_semantic_indexing(&counts_5x8(), Some(3)).unwrap();
        assert_close(&latent.mapv(f64::abs), &reference.mapv(f64::abs));
    }

    #[test]
    fn test_zero_frequency_feature_rejected() {
        let mut x = counts_5x8();
        x.column_mut(6).fill(0.0);
        let err = latent_semantic_indexing(&x, Some(2)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PreprocessError>(),
            Some(&PreprocessError::ZeroFrequencyFeature { feature: 6 })
        );
    }

    #[test]
    fn test_zero_frequency_feature_zero_weight() {
        let mut x = counts_5x8();
        x.column_mut(6).fill(0.0);
        let mut lsi = LatentSemanticIndexingBuilder::default()
            .zero_frequency_policy(ZeroFrequencyPolicy::ZeroWeight)
            .n_components(3)
            .build();
        let latent = lsi.fit_transform(&x).unwrap();

        assert_eq!(latent.dim(), (5, 3));
        assert!(latent.iter().all(|v| v.is_finite()));
        assert_eq!(lsi.idf().unwrap()[6], 0.0);
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut x = counts_5x8();
        x[[2, 3]] = -1.0;
        let err = latent_semantic_indexing(&x, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PreprocessError>(),
            Some(&PreprocessError::NegativeCount {
                row: 2,
                col: 3,
                value: -1.0
            })
        );
    }

    #[test]
    fn test_component_bounds() {
        let x = counts_5x8();
        let err = latent_semantic_indexing(&x, Some(0)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PreprocessError>(),
            Some(&PreprocessError::InvalidComponents)
        );

        let err = latent_semantic_indexing(&x, Some(100)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PreprocessError>(),
            Some(&PreprocessError::TooManyComponents {
                requested: 100,
                available: 5
            })
        );

        let mut lsi = LatentSemanticIndexingBuilder::default()
            .n_components(100)
            .clamp_components(true)
            .build();
        assert_eq!(lsi.fit_transform(&x).unwrap().dim(), (5, 5));
    }

    #[test]
    fn test_empty_input() {
        let x = Array2::<f64>::zeros((0, 8));
        let err = latent_semantic_indexing(&x, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PreprocessError>(),
            Some(&PreprocessError::EmptyMatrix { rows: 0, cols: 8 })
        );
    }

    #[test]
    fn test_sparse_matches_dense() {
        let x = counts_5x8();
        let mut coo = CooMatrix::new(5, 8);
        for ((i, j), &v) in x.indexed_iter() {
            if v != 0.0 {
                coo.push(i, j, v);
            }
        }
        let csr = CsrMatrix::from(&coo);

        let mut sparse_lsi = LatentSemanticIndexingBuilder::default().n_components(3).build();
        let sparse = sparse_lsi.fit_transform_sparse(&csr).unwrap();
        let dense = latent_semantic_indexing(&x, Some(3)).unwrap();
        assert_close(&sparse, &dense);
    }

    #[test]
    fn test_not_fitted() {
        let lsi = LatentSemanticIndexingBuilder::default().build();
        assert!(lsi.idf().is_none());
        assert!(lsi.reconstruct().is_err());
    }
}
