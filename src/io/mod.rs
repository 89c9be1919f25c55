//! Reading cell x feature tables.
//!
//! Layout: a header row, then one row per cell. The first column holds the cell identifier and
//! is not part of the feature matrix; every other column must be numeric.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::Array2;

use crate::error::PreprocessError;

/// One modality as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CellTable {
    pub cell_ids: Vec<String>,
    pub feature_names: Vec<String>,
    /// `cell_ids.len() x feature_names.len()`
    pub values: Array2<f64>,
}

impl CellTable {
    pub fn n_cells(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }
}

pub fn read_cell_table<P: AsRef<Path>>(path: P) -> Result<CellTable> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening cell table {}", path.display()))?;
    let table = read_cell_table_from_reader(file, &path.display().to_string())?;
    log::info!(
        "Read {} cells x {} features from {}",
        table.n_cells(),
        table.n_features(),
        path.display()
    );
    Ok(table)
}

/// Parses a table from any reader; `source` only labels error messages.
pub fn read_cell_table_from_reader<R: Read>(reader: R, source: &str) -> Result<CellTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {source}"))?
        .clone();
    if headers.len() < 2 {
        bail!(
            "{source}: expected an identifier column followed by at least one feature column, found {} column(s)",
            headers.len()
        );
    }
    let feature_names: Vec<String> = headers.iter().skip(1).map(|h| h.to_string()).collect();
    let n_features = feature_names.len();

    let mut cell_ids = Vec::new();
    let mut data = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("{source}: CSV row {}", row_no + 1))?;
        let line = record.position().map(|p| p.line()).unwrap_or(row_no as u64 + 2);

        let mut fields = record.iter();
        cell_ids.push(fields.next().unwrap_or_default().to_string());
        for (col, field) in fields.enumerate() {
            let value = field.parse::<f64>().with_context(|| {
                format!(
                    "{source}: line {line}, column {:?}: '{field}' is not a number",
                    feature_names[col]
                )
            })?;
            if !value.is_finite() {
                return Err(PreprocessError::NonFinite { row: row_no, col }).with_context(|| {
                    format!(
                        "{source}: line {line}, column {:?}: '{field}'",
                        feature_names[col]
                    )
                });
            }
            data.push(value);
        }
    }

    let values = Array2::from_shape_vec((cell_ids.len(), n_features), data)
        .with_context(|| format!("{source}: building {} x {n_features} matrix", cell_ids.len()))?;
    if values.nrows() == 0 {
        bail!(PreprocessError::EmptyMatrix {
            rows: 0,
            cols: n_features,
        });
    }

    Ok(CellTable {
        cell_ids,
        feature_names,
        values,
    })
}
