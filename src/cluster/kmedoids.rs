use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{MosaicError, Result};
use crate::features::FeatureSet;
use crate::types::{Metric, RefinementStrategy, SeedingStrategy};

use super::matrix::DistanceMatrix;
use super::refine::{assign_labels, update_medoids};
use super::seeding::{best_seed, dispersion, draw_medoids, Seed};

/// Hyper-parameters of a k-medoids run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMedoidsConfig {
    /// Number of clusters (visual words).
    pub k: usize,
    /// Upper bound on refinement iterations.
    pub max_iter: usize,
    pub seeding: SeedingStrategy,
    /// Independent seeding attempts; the cheapest one is refined.
    pub seed_attempts: usize,
    pub refinement: RefinementStrategy,
    /// Base RNG seed. `None` draws one from entropy.
    pub seed: Option<u64>,
    /// Worker threads for the seeding pool. `0` uses one per core.
    pub threads: usize,
}

impl KMedoidsConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }
}

impl Default for KMedoidsConfig {
    fn default() -> Self {
        Self {
            k: 1000,
            max_iter: 300,
            seeding: SeedingStrategy::KMeansPlusPlus,
            seed_attempts: 5,
            refinement: RefinementStrategy::PerCluster,
            seed: None,
            threads: 0,
        }
    }
}

/// Where a clustering run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPhase {
    Seeding,
    Refining,
    /// The medoid set stopped changing.
    Converged,
    /// `max_iter` was exhausted before convergence.
    MaxIterReached,
}

/// Result of a k-medoids run over a training set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Medoid sample indices, one per cluster position.
    pub medoids: Vec<usize>,
    /// Cluster position of every training sample.
    pub labels: Vec<usize>,
    /// Refinement iterations performed.
    pub iterations: usize,
    pub phase: ClusterPhase,
    /// Dispersion of the winning seed.
    pub seed_cost: f64,
    /// Which seeding attempt won.
    pub seed_attempt: usize,
}

impl Clustering {
    pub fn converged(&self) -> bool {
        self.phase == ClusterPhase::Converged
    }
}

/// k-medoids over a precomputed distance matrix.
#[derive(Debug, Clone)]
pub struct MedoidClusterer {
    config: KMedoidsConfig,
}

impl MedoidClusterer {
    pub fn new(config: KMedoidsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMedoidsConfig {
        &self.config
    }

    /// Reject configurations that cannot run on `n` samples.
    pub fn validate(&self, n: usize) -> Result<()> {
        let c = &self.config;
        if n == 0 {
            return Err(MosaicError::Configuration("training set is empty".into()));
        }
        if c.k == 0 {
            return Err(MosaicError::Configuration("k must be > 0".into()));
        }
        if c.k > n {
            return Err(MosaicError::Configuration(format!(
                "k = {} exceeds the number of samples ({n})",
                c.k
            )));
        }
        if c.max_iter == 0 {
            return Err(MosaicError::Configuration("max_iter must be > 0".into()));
        }
        if c.seed_attempts == 0 {
            return Err(MosaicError::Configuration("seed_attempts must be > 0".into()));
        }
        Ok(())
    }

    /// Cluster `features` under `metric`.
    pub fn fit(&self, features: &FeatureSet, metric: Metric) -> Result<Clustering> {
        if metric == Metric::Hamming && !features.is_binary() {
            return Err(MosaicError::Configuration(
                "hamming metric requires bit-expanded binary descriptors".into(),
            ));
        }
        self.fit_with(features, |a, b| metric.distance(a, b))
    }

    /// Cluster `features` under an arbitrary symmetric distance function.
    ///
    /// The configuration is validated before any distance is computed.
    pub fn fit_with<F>(&self, features: &FeatureSet, distance: F) -> Result<Clustering>
    where
        F: Fn(&[f32], &[f32]) -> f32 + Sync,
    {
        self.validate(features.len())?;
        let matrix = DistanceMatrix::build_with(features, distance);
        self.fit_matrix(&matrix)
    }

    /// Cluster the samples of an already built distance matrix.
    #[instrument(skip(self, matrix), fields(n = matrix.len(), k = self.config.k))]
    pub fn fit_matrix(&self, matrix: &DistanceMatrix) -> Result<Clustering> {
        self.validate(matrix.len())?;

        debug!(phase = ?ClusterPhase::Seeding, attempts = self.config.seed_attempts, "k-medoids started");
        let seed = self.seed(matrix)?;
        debug!(
            attempt = seed.attempt,
            cost = seed.cost,
            strategy = %self.config.seeding,
            "selected initial medoids"
        );

        debug!(phase = ?ClusterPhase::Refining, max_iter = self.config.max_iter, "refining medoids");
        let (medoids, iterations, phase) = self.refine(matrix, seed.medoids.clone());
        let labels = assign_labels(matrix, &medoids);

        info!(
            iterations,
            phase = ?phase,
            refinement = %self.config.refinement,
            "k-medoids finished"
        );

        Ok(Clustering {
            medoids,
            labels,
            iterations,
            phase,
            seed_cost: seed.cost,
            seed_attempt: seed.attempt,
        })
    }

    /// Run every seeding attempt on a bounded pool and keep the cheapest.
    fn seed(&self, matrix: &DistanceMatrix) -> Result<Seed> {
        let c = &self.config;
        let base = c.seed.unwrap_or_else(rand::random);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(c.threads)
            .build()
            .map_err(|e| MosaicError::Internal(format!("failed to build seeding pool: {e}")))?;

        let seeds: Vec<Seed> = pool.install(|| {
            (0..c.seed_attempts)
                .into_par_iter()
                .map(|attempt| {
                    let mut rng = StdRng::seed_from_u64(base.wrapping_add(attempt as u64));
                    let medoids = draw_medoids(matrix, c.k, c.seeding, &mut rng);
                    let cost = dispersion(matrix, &medoids);
                    Seed {
                        attempt,
                        medoids,
                        cost,
                    }
                })
                .collect()
        });

        for s in &seeds {
            debug!(attempt = s.attempt, cost = s.cost, "seeding attempt");
        }

        best_seed(seeds).ok_or_else(|| MosaicError::Internal("no seeding attempt ran".into()))
    }

    /// Alternate assignment and medoid updates until the medoid set is
    /// unchanged or `max_iter` iterations have run.
    fn refine(&self, matrix: &DistanceMatrix, mut medoids: Vec<usize>) -> (Vec<usize>, usize, ClusterPhase) {
        let k = self.config.k;
        let mut previous: HashSet<usize> = medoids.iter().copied().collect();
        let mut iterations = 0;

        while iterations < self.config.max_iter {
            debug_assert_eq!(medoids.len(), k);
            let labels = assign_labels(matrix, &medoids);
            medoids = update_medoids(matrix, &labels, &medoids, self.config.refinement);
            iterations += 1;
            debug_assert_eq!(medoids.len(), k);

            let current: HashSet<usize> = medoids.iter().copied().collect();
            let changed = current.symmetric_difference(&previous).count() / 2;
            debug!(iteration = iterations, changed, "refinement iteration");

            if current == previous {
                return (medoids, iterations, ClusterPhase::Converged);
            }
            previous = current;
        }

        (medoids, iterations, ClusterPhase::MaxIterReached)
    }
}
