use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MosaicError;

/// Surrogate key of an indexed document.
pub type DocId = i64;

/// Index of a visual word (a cluster position in the vocabulary).
pub type WordId = usize;

/// Distance metric over descriptor vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Continuous descriptors (SIFT-like).
    #[default]
    Euclidean,
    /// Bit-expanded binary descriptors (ORB, BRISK).
    Hamming,
}

impl Metric {
    /// Distance between two descriptors of equal width.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        crate::distance::compute_distance(a, b, *self)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Euclidean => write!(f, "euclidean"),
            Metric::Hamming => write!(f, "hamming"),
        }
    }
}

impl FromStr for Metric {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Metric::Euclidean),
            "hamming" => Ok(Metric::Hamming),
            other => Err(MosaicError::Configuration(format!(
                "unknown metric '{other}', expected 'euclidean' or 'hamming'"
            ))),
        }
    }
}

/// How initial medoids are drawn for each seeding attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedingStrategy {
    /// K distinct samples drawn uniformly without replacement.
    Random,
    /// First medoid uniform, then sampled proportional to squared distance
    /// from the nearest medoid chosen so far.
    #[default]
    #[serde(rename = "kmeans++", alias = "kmeans_plus_plus")]
    KMeansPlusPlus,
}

impl std::fmt::Display for SeedingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedingStrategy::Random => write!(f, "random"),
            SeedingStrategy::KMeansPlusPlus => write!(f, "kmeans++"),
        }
    }
}

impl FromStr for SeedingStrategy {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(SeedingStrategy::Random),
            "kmeans++" | "kmeans_plus_plus" | "kmeanspp" => Ok(SeedingStrategy::KMeansPlusPlus),
            other => Err(MosaicError::Configuration(format!(
                "unknown seeding strategy '{other}', expected 'random' or 'kmeans++'"
            ))),
        }
    }
}

/// Execution strategy for the medoid update step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementStrategy {
    /// One parallel pass building a K x n table of masked distance sums.
    Batched,
    /// One cluster's member block at a time; O(n) extra memory.
    #[default]
    PerCluster,
}

impl std::fmt::Display for RefinementStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefinementStrategy::Batched => write!(f, "batched"),
            RefinementStrategy::PerCluster => write!(f, "per_cluster"),
        }
    }
}

impl FromStr for RefinementStrategy {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "batched" => Ok(RefinementStrategy::Batched),
            "per_cluster" | "per-cluster" => Ok(RefinementStrategy::PerCluster),
            other => Err(MosaicError::Configuration(format!(
                "unknown refinement strategy '{other}', expected 'batched' or 'per_cluster'"
            ))),
        }
    }
}

/// A document surfaced by the posting-list prefilter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub doc_id: DocId,
    /// Number of query words whose posting lists contain this document.
    pub shared_words: usize,
}

/// A re-ranked query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub doc_id: DocId,
    pub name: String,
    /// Euclidean distance between histograms.
    pub distance: f32,
}

/// Outcome of adding a document to the inverted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddOutcome {
    /// The document was new; `words` postings were written.
    Indexed { doc_id: DocId, words: usize },
    /// A document with this name already existed; nothing was written.
    Skipped { doc_id: DocId },
}

impl AddOutcome {
    pub fn doc_id(&self) -> DocId {
        match self {
            AddOutcome::Indexed { doc_id, .. } | AddOutcome::Skipped { doc_id } => *doc_id,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, AddOutcome::Indexed { .. })
    }
}
