use std::sync::Arc;

use anyhow::{anyhow, bail};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::dimred::resolve_components;
use crate::error::PreprocessError;
use crate::svd::{svd_flip, NalgebraSVD, SVDImplementation};

pub struct PCABuilder<S: SVDImplementation> {
    n_components: Option<usize>,
    clamp_components: bool,
    svd_implementation: Arc<S>,
}

impl Default for PCABuilder<NalgebraSVD> {
    fn default() -> Self {
        Self::new(NalgebraSVD::default())
    }
}

impl<S: SVDImplementation> PCABuilder<S> {
    pub fn new(svd_implementation: S) -> Self {
        PCABuilder {
            n_components: None,
            clamp_components: false,
            svd_implementation: Arc::new(svd_implementation),
        }
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    /// Lower `n_components` to `min(n_samples, n_features)` instead of failing.
    pub fn clamp_components(mut self, clamp: bool) -> Self {
        self.clamp_components = clamp;
        self
    }

    pub fn build(self) -> Pca<S> {
        Pca {
            n_components: self.n_components,
            clamp_components: self.clamp_components,
            svd_implementation: self.svd_implementation,
            components: None,
            mean: None,
            explained_variance_ratio: None,
            total_variance: None,
            eigenvalues: None,
        }
    }
}

/// Dense principal component analysis.
///
/// Components are the leading right singular vectors of the centred data, with signs fixed by
/// [`svd_flip`] so repeated fits give identical scores. Feature scaling is left to the caller
/// (see [`Standardize`](crate::Standardize)).
pub struct Pca<S: SVDImplementation> {
    n_components: Option<usize>,
    clamp_components: bool,
    svd_implementation: Arc<S>,
    components: Option<Array2<f64>>,
    mean: Option<Array1<f64>>,
    explained_variance_ratio: Option<Array1<f64>>,
    total_variance: Option<f64>,
    eigenvalues: Option<Array1<f64>>,
}

impl<S: SVDImplementation> Pca<S> {
    pub fn fit(&mut self, x: ArrayView2<f64>) -> anyhow::Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 || n_features == 0 {
            bail!(PreprocessError::EmptyMatrix {
                rows: n_samples,
                cols: n_features,
            });
        }
        let n_components = resolve_components(
            self.n_components,
            n_samples.min(n_features),
            self.clamp_components,
        )?;

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow!("Failed to compute mean"))?;
        let x_centered = center(x, &mean);

        let svd = self.svd_implementation.compute(x_centered.view())?;
        let mut u = svd.u().clone();
        let mut vt = svd.vt().clone();
        svd_flip(&mut u, &mut vt)?;

        let components = vt.slice(s![..n_components, ..]).to_owned();

        // a single sample has no spread; keep the divisor at 1 instead of dividing by zero
        let dof = (n_samples.max(2) - 1) as f64;
        let eigenvalues = svd.s().mapv(|v| v * v / dof);

        let total_variance = eigenvalues.sum();
        let explained_variance_ratio = if total_variance > 0.0 {
            &eigenvalues / total_variance
        } else {
            Array1::zeros(eigenvalues.len())
        };

        log::debug!(
            "PCA fitted on {} x {}: kept {} components explaining {:.2}% of variance",
            n_samples,
            n_features,
            n_components,
            explained_variance_ratio.slice(s![..n_components]).sum() * 100.0
        );

        self.components = Some(components);
        self.mean = Some(mean);
        self.explained_variance_ratio = Some(
            explained_variance_ratio
                .slice(s![..n_components])
                .to_owned(),
        );
        self.total_variance = Some(total_variance);
        self.eigenvalues = Some(eigenvalues.slice(s![..n_components]).to_owned());

        Ok(())
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        let components = self
            .components
            .as_ref()
            .ok_or(PreprocessError::NotFitted)?;
        if x.ncols() != components.ncols() {
            bail!(
                "PCA was fitted on {} features but the input has {}",
                components.ncols(),
                x.ncols()
            );
        }
        let mean = self.mean.as_ref().ok_or(PreprocessError::NotFitted)?;
        Ok(center(x, mean).dot(&components.t()))
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn components(&self) -> Option<&Array2<f64>> {
        self.components.as_ref()
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn explained_variance_ratio(&self) -> Option<&Array1<f64>> {
        self.explained_variance_ratio.as_ref()
    }

    pub fn total_variance(&self) -> Option<f64> {
        self.total_variance
    }

    pub fn eigenvalues(&self) -> Option<&Array1<f64>> {
        self.eigenvalues.as_ref()
    }
}

fn center(x: ArrayView2<f64>, mean: &Array1<f64>) -> Array2<f64> {
    let mut centered = x.to_owned();
    centered
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| {
            row -= mean;
        });
    centered
}
