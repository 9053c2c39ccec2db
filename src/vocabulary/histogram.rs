use serde::{Deserialize, Serialize};

use crate::distance::euclidean_distance;
use crate::error::{MosaicError, Result};
use crate::types::WordId;

/// Frequencies of visual words in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    bins: Vec<f32>,
}

impl Histogram {
    pub fn new(bins: Vec<f32>) -> Self {
        Self { bins }
    }

    /// Normalise raw word counts by the number of descriptors they came
    /// from. A zero total yields an all-zero histogram.
    pub fn from_counts(counts: &[u32], total: usize) -> Self {
        let bins = if total == 0 {
            vec![0.0; counts.len()]
        } else {
            let total = total as f32;
            counts.iter().map(|&c| c as f32 / total).collect()
        };
        Self { bins }
    }

    /// Vocabulary size.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    pub fn get(&self, word: WordId) -> Option<f32> {
        self.bins.get(word).copied()
    }

    /// Words with a nonzero frequency, ascending.
    pub fn nonzero_words(&self) -> impl Iterator<Item = WordId> + '_ {
        self.bins
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(w, _)| w)
    }

    pub fn sum(&self) -> f32 {
        self.bins.iter().sum()
    }

    /// Euclidean distance to another histogram over the same vocabulary.
    pub fn distance(&self, other: &Histogram) -> Result<f32> {
        if self.len() != other.len() {
            return Err(MosaicError::DimensionMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        Ok(euclidean_distance(&self.bins, &other.bins))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.bins)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self {
            bins: bincode::deserialize(data)?,
        })
    }
}
