use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::{MosaicError, Result};
use crate::features::FeatureSet;
use crate::types::Metric;

/// Dense, symmetric pairwise-distance cache over a training set.
///
/// Built once per training run and read many times by seeding and
/// refinement. Storage is a row-major `n * n` buffer of `f32`, so a
/// 30 000-sample corpus needs roughly 3.6 GB.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f32>,
}

impl DistanceMatrix {
    /// Compute all pairwise distances of `features` under `metric`.
    pub fn build(features: &FeatureSet, metric: Metric) -> Self {
        Self::build_with(features, |a, b| metric.distance(a, b))
    }

    /// Compute all pairwise distances with an arbitrary distance function.
    ///
    /// Rows are filled in parallel. `distance` must be symmetric; the
    /// diagonal is forced to zero.
    #[instrument(skip(features, distance), fields(n = features.len(), dim = features.dim()))]
    pub fn build_with<F>(features: &FeatureSet, distance: F) -> Self
    where
        F: Fn(&[f32], &[f32]) -> f32 + Sync,
    {
        let n = features.len();
        let mut data = vec![0.0f32; n * n];

        if n > 0 {
            data.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
                let a = features.row(i);
                for (j, cell) in row.iter_mut().enumerate() {
                    *cell = if i == j {
                        0.0
                    } else {
                        distance(a, features.row(j))
                    };
                }
            });
        }

        debug!(n, bytes = data.len() * std::mem::size_of::<f32>(), "built distance matrix");

        Self { n, data }
    }

    /// Wrap an already computed row-major `n * n` buffer.
    ///
    /// The buffer must be square, symmetric and zero on the diagonal.
    pub fn from_raw(data: Vec<f32>) -> Result<Self> {
        let n = (data.len() as f64).sqrt().round() as usize;
        if n * n != data.len() {
            return Err(MosaicError::Validation(format!(
                "distance buffer of length {} is not square",
                data.len()
            )));
        }
        for i in 0..n {
            if data[i * n + i] != 0.0 {
                return Err(MosaicError::Validation(format!(
                    "nonzero self-distance at {i}"
                )));
            }
            for j in i + 1..n {
                if data[i * n + j] != data[j * n + i] {
                    return Err(MosaicError::Validation(format!(
                        "distances ({i}, {j}) and ({j}, {i}) differ"
                    )));
                }
            }
        }
        Ok(Self { n, data })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.n + j]
    }

    /// Distances from sample `i` to every sample.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.n;
        &self.data[start..start + self.n]
    }
}
