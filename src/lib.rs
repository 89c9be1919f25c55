pub mod dataset;
pub mod dense;
pub mod dimred;
pub mod error;
pub mod io;
pub mod sparse;
pub mod svd;
mod utils;

pub use dataset::{CellDataset, PairedCellDataset, PairedSample, SyntheticPairedDataset};
pub use dimred::lsi::{latent_semantic_indexing, ZeroFrequencyPolicy};
pub use error::PreprocessError;
pub use utils::FeatureScaling;
pub use utils::NumericOps;
pub use utils::Standardize;
