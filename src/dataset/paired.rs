use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use ndarray::{Array2, ArrayBase, ArrayView2, Data, Ix2};
use serde::{Deserialize, Serialize};

use crate::dense::{to_f32, to_f64};
use crate::dimred::lsi::{LatentSemanticIndexingBuilder, ZeroFrequencyPolicy};
use crate::dimred::pca::PCABuilder;
use crate::error::PreprocessError;
use crate::io::{read_cell_table, CellTable};
use crate::utils::Standardize;
use crate::NumericOps;

use super::CellDataset;

/// Construction parameters of a [`PairedCellDataset`].
///
/// Deserializes from JSON with every field optional; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairedDatasetConfig {
    /// Cell x peak counts, default `./data/expr_atac_processed.csv`.
    pub accessibility_source: PathBuf,
    /// Cell x gene expression, default `./data/expr_rna_processed.csv`.
    pub expression_source: PathBuf,
    /// Standardize + PCA the expression matrix and LSI the accessibility matrix.
    pub apply_dimensionality_reduction: bool,
    pub expression_components: usize,
    pub accessibility_components: usize,
    pub zero_frequency_policy: ZeroFrequencyPolicy,
    /// Lower component counts to what the data supports instead of failing.
    pub clamp_components: bool,
}

impl Default for PairedDatasetConfig {
    fn default() -> Self {
        Self {
            accessibility_source: PathBuf::from("./data/expr_atac_processed.csv"),
            expression_source: PathBuf::from("./data/expr_rna_processed.csv"),
            apply_dimensionality_reduction: false,
            expression_components: 100,
            accessibility_components: 100,
            zero_frequency_policy: ZeroFrequencyPolicy::Reject,
            clamp_components: false,
        }
    }
}

impl PairedDatasetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accessibility_source<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.accessibility_source = path.into();
        self
    }

    pub fn expression_source<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.expression_source = path.into();
        self
    }

    pub fn apply_dimensionality_reduction(mut self, apply: bool) -> Self {
        self.apply_dimensionality_reduction = apply;
        self
    }

    pub fn expression_components(mut self, n_components: usize) -> Self {
        self.expression_components = n_components;
        self
    }

    pub fn accessibility_components(mut self, n_components: usize) -> Self {
        self.accessibility_components = n_components;
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

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parsing paired dataset configuration")
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::from_json_str(&text)
    }
}

/// Accessibility and expression matrices of the same cells, stored as `f32`.
///
/// All preprocessing happens once in the constructor; afterwards the dataset is read-only.
#[derive(Debug, Clone)]
pub struct PairedCellDataset {
    accessibility: Array2<f32>,
    expression: Array2<f32>,
    cell_ids: Option<Vec<String>>,
}

impl PairedCellDataset {
    /// Reads both tables named in `config` and builds the dataset.
    pub fn from_config(config: &PairedDatasetConfig) -> anyhow::Result<Self> {
        let accessibility = read_cell_table(&config.accessibility_source)?;
        let expression = read_cell_table(&config.expression_source)?;
        Self::from_tables(accessibility, expression, config)
    }

    pub fn from_tables(
        accessibility: CellTable,
        expression: CellTable,
        config: &PairedDatasetConfig,
    ) -> anyhow::Result<Self> {
        if let Some((row, (a, e))) = accessibility
            .cell_ids
            .iter()
            .zip(&expression.cell_ids)
            .enumerate()
            .find(|(_, (a, e))| a != e)
        {
            log::warn!(
                "Cell identifiers differ between modalities (first at row {}: '{}' vs '{}'); pairing by position",
                row,
                a,
                e
            );
        }

        let mut dataset = Self::from_matrices(&accessibility.values, &expression.values, config)?;
        dataset.cell_ids = Some(accessibility.cell_ids);
        Ok(dataset)
    }

    /// Builds the dataset from matrices already in memory (cells as rows).
    pub fn from_matrices<SA, SE, TA, TE>(
        accessibility: &ArrayBase<SA, Ix2>,
        expression: &ArrayBase<SE, Ix2>,
        config: &PairedDatasetConfig,
    ) -> anyhow::Result<Self>
    where
        SA: Data<Elem = TA>,
        SE: Data<Elem = TE>,
        TA: NumericOps,
        TE: NumericOps,
    {
        if accessibility.nrows() != expression.nrows() {
            bail!(PreprocessError::RowCountMismatch {
                accessibility: accessibility.nrows(),
                expression: expression.nrows(),
            });
        }

        let mut accessibility = to_f64(accessibility)?;
        let mut expression = to_f64(expression)?;

        if config.apply_dimensionality_reduction {
            expression.standardize()?;
            let mut pca = PCABuilder::default()
                .n_components(config.expression_components)
                .clamp_components(config.clamp_components)
                .build();
            expression = pca
                .fit_transform(expression.view())
                .context("reducing expression matrix")?;

            let mut lsi = LatentSemanticIndexingBuilder::default()
                .n_components(config.accessibility_components)
                .zero_frequency_policy(config.zero_frequency_policy)
                .clamp_components(config.clamp_components)
                .build();
            accessibility = lsi
                .fit_transform(&accessibility)
                .context("reducing accessibility matrix")?;
        }

        log::info!(
            "Paired dataset: {} cells, {} accessibility features, {} expression features{}",
            accessibility.nrows(),
            accessibility.ncols(),
            expression.ncols(),
            if config.apply_dimensionality_reduction {
                " (reduced)"
            } else {
                ""
            }
        );

        Ok(Self {
            accessibility: to_f32(accessibility.view()),
            expression: to_f32(expression.view()),
            cell_ids: None,
        })
    }

    /// Cell identifiers when the dataset was read from tables.
    pub fn cell_ids(&self) -> Option<&[String]> {
        self.cell_ids.as_deref()
    }
}

impl CellDataset for PairedCellDataset {
    fn accessibility(&self) -> ArrayView2<'_, f32> {
        self.accessibility.view()
    }

    fn expression(&self) -> ArrayView2<'_, f32> {
        self.expression.view()
    }
}
