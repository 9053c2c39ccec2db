//! Descriptor tables.
//!
//! A `FeatureSet` holds the descriptors of one document (or a pooled
//! training corpus) in a single row-major buffer with a fixed width.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{MosaicError, Result};

/// An ordered set of fixed-width descriptor vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    dim: usize,
    data: Vec<f32>,
}

impl FeatureSet {
    /// Create an empty set of `dim`-wide descriptors.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    /// Build a set from individual rows. All rows must share one width.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let dim = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut set = Self::with_capacity(dim, rows.len());
        for row in rows {
            set.push(row.as_ref())?;
        }
        Ok(set)
    }

    /// Build a set from byte-packed binary descriptors, expanding every byte
    /// into eight 0/1 components (most significant bit first).
    pub fn from_packed<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let dim = rows.first().map(|r| r.as_ref().len() * 8).unwrap_or(0);
        let mut set = Self::with_capacity(dim, rows.len());
        for row in rows {
            let bits = expand_bits(row.as_ref());
            set.push(&bits)?;
        }
        Ok(set)
    }

    pub fn with_capacity(dim: usize, rows: usize) -> Self {
        Self {
            dim,
            data: Vec::with_capacity(dim * rows),
        }
    }

    /// Append one descriptor.
    pub fn push(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.dim {
            return Err(MosaicError::DimensionMismatch {
                expected: self.dim,
                actual: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    /// Append every descriptor of `other`.
    pub fn extend(&mut self, other: &FeatureSet) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.dim == 0 {
            self.dim = other.dim;
        }
        if other.dim != self.dim {
            return Err(MosaicError::DimensionMismatch {
                expected: self.dim,
                actual: other.dim,
            });
        }
        self.data.extend_from_slice(&other.data);
        Ok(())
    }

    /// Descriptor width.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`-th descriptor. Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.dim;
        &self.data[start..start + self.dim]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.dim.max(1))
    }

    /// The raw row-major buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// True when every component is exactly 0 or 1.
    pub fn is_binary(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0 || v == 1.0)
    }

    /// Copy of this set without descriptors whose components are all zero.
    ///
    /// Dense keypoint grids produce many such rows where keypoints overlap;
    /// they would otherwise collapse into one oversized visual word.
    pub fn without_zero_rows(&self) -> FeatureSet {
        let mut out = FeatureSet::with_capacity(self.dim, self.len());
        for row in self.rows() {
            if row.iter().any(|&v| v != 0.0) {
                out.data.extend_from_slice(row);
            }
        }
        out
    }

    /// Copy of `count` descriptors drawn uniformly without replacement.
    /// Returns a full copy when `count >= len()`.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> FeatureSet {
        if count >= self.len() {
            return self.clone();
        }
        let mut picked = rand::seq::index::sample(rng, self.len(), count).into_vec();
        // Keep the original row order so sub-samples read like the corpus.
        picked.sort_unstable();
        self.select(&picked)
    }

    /// Copy of the rows at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> FeatureSet {
        let mut out = FeatureSet::with_capacity(self.dim, indices.len());
        for &i in indices {
            out.data.extend_from_slice(self.row(i));
        }
        out
    }
}

/// Expand packed bytes into 0/1 components, most significant bit first.
pub fn expand_bits(bytes: &[u8]) -> Vec<f32> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push(((byte >> shift) & 1) as f32);
        }
    }
    bits
}
