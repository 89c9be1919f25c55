use anyhow::bail;
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::PreprocessError;

use super::CellDataset;

/// Rows of several cells stacked in fetch order.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedBatch {
    pub accessibility: Array2<f32>,
    pub expression: Array2<f32>,
    pub indices: Vec<usize>,
}

impl PairedBatch {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Walks a [`CellDataset`] in fixed-size batches, in order or in a seeded random permutation.
pub struct BatchLoader<'a, D: CellDataset> {
    dataset: &'a D,
    order: Vec<usize>,
    batch_size: usize,
    drop_last: bool,
    position: usize,
}

impl<'a, D: CellDataset> BatchLoader<'a, D> {
    pub fn new(dataset: &'a D, batch_size: usize) -> anyhow::Result<Self> {
        if batch_size == 0 {
            bail!(PreprocessError::InvalidBatchSize);
        }
        Ok(Self {
            dataset,
            order: (0..dataset.len()).collect(),
            batch_size,
            drop_last: false,
            position: 0,
        })
    }

    pub fn shuffle(mut self, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.order.shuffle(&mut rng);
        self
    }

    /// Skip the final batch when it would be shorter than `batch_size`.
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn num_batches(&self) -> usize {
        let n = self.order.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }
}

impl<D: CellDataset> Iterator for BatchLoader<'_, D> {
    type Item = PairedBatch;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.order.len() - self.position;
        if remaining == 0 || (self.drop_last && remaining < self.batch_size) {
            return None;
        }
        let end = self.position + remaining.min(self.batch_size);
        let indices = self.order[self.position..end].to_vec();
        self.position = end;

        Some(PairedBatch {
            accessibility: self.dataset.accessibility().select(Axis(0), &indices),
            expression: self.dataset.expression().select(Axis(0), &indices),
            indices,
        })
    }
}
