use ndarray::{Array2, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::CellDataset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub n_cells: usize,
    pub accessibility_features: usize,
    pub expression_features: usize,
    /// Fixed seed for reproducible matrices; `None` draws a fresh seed.
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_cells: 100,
            accessibility_features: 1000,
            expression_features: 1000,
            seed: None,
        }
    }
}

/// Stand-in dataset with independent uniform `[0, 1)` matrices.
///
/// The rows share nothing but their count; only the indexing contract is meaningful.
#[derive(Debug, Clone)]
pub struct SyntheticPairedDataset {
    accessibility: Array2<f32>,
    expression: Array2<f32>,
}

impl SyntheticPairedDataset {
    /// 100 cells x 1000 features per modality.
    pub fn new() -> Self {
        Self::with_config(&SyntheticConfig::default())
    }

    pub fn with_config(config: &SyntheticConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        let accessibility = Array2::from_shape_fn(
            (config.n_cells, config.accessibility_features),
            |_| rng.random::<f32>(),
        );
        let expression = Array2::from_shape_fn(
            (config.n_cells, config.expression_features),
            |_| rng.random::<f32>(),
        );
        log::debug!(
            "Synthetic paired dataset: {} cells, {} / {} features",
            config.n_cells,
            config.accessibility_features,
            config.expression_features
        );
        Self {
            accessibility,
            expression,
        }
    }
}

impl Default for SyntheticPairedDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl CellDataset for SyntheticPairedDataset {
    fn accessibility(&self) -> ArrayView2<'_, f32> {
        self.accessibility.view()
    }

    fn expression(&self) -> ArrayView2<'_, f32> {
        self.expression.view()
    }
}
