use ndarray::Array1;
use num_traits::{NumCast, Zero};

/// Element types accepted as raw input matrices (counts or measurements).
///
/// Everything is converted to `f64` before any decomposition runs.
pub trait NumericOps: NumCast + Zero + Copy + PartialOrd + Send + Sync {}

impl<T> NumericOps for T where T: NumCast + Zero + Copy + PartialOrd + Send + Sync {}

/// Per-feature zero-mean / unit-variance scaling, applied in place.
pub trait Standardize {
    fn standardize(&mut self) -> anyhow::Result<FeatureScaling>;
}

/// Statistics fitted by [`Standardize::standardize`], one entry per feature (column).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaling {
    pub mean: Array1<f64>,
    /// Population standard deviation; features without variance keep a scale of 1.
    pub scale: Array1<f64>,
}

impl FeatureScaling {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}
