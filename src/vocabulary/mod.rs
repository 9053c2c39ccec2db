//! Visual vocabulary: the frozen medoid set of a training run.
//!
//! The vocabulary copies the medoid descriptors out of the training corpus,
//! so it can quantize new documents without the corpus or its distance
//! matrix. It is persisted as a single checksummed blob.

pub mod histogram;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use ulid::Ulid;
use xxhash_rust::xxh3::xxh3_64;

use crate::cluster::{Clustering, KMedoidsConfig, MedoidClusterer};
use crate::distance::{hamming_distance, squared_euclidean_distance};
use crate::error::{MosaicError, Result};
use crate::features::FeatureSet;
use crate::storage::MosaicStore;
use crate::types::{Metric, WordId};

pub use histogram::Histogram;

const BLOB_FORMAT_VERSION: u32 = 1;
const VOCABULARY_PREFIX: &str = "vocabularies";

/// A trained, read-only set of visual words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualVocabulary {
    id: Ulid,
    name: String,
    metric: Metric,
    dim: usize,
    /// Materialized medoid descriptors, indexed by word id.
    words: Vec<Vec<f32>>,
    iterations: usize,
    converged: bool,
    trained_at: DateTime<Utc>,
}

/// On-storage envelope around the serialized vocabulary.
#[derive(Serialize, Deserialize)]
struct VocabularyBlob {
    version: u32,
    checksum: u64,
    payload: Vec<u8>,
}

impl VisualVocabulary {
    /// Train a vocabulary on `features`: validate, build the distance
    /// matrix, cluster, then copy out the medoid descriptors.
    #[instrument(skip_all, fields(name = name, n = features.len(), k = config.k, metric = %metric))]
    pub fn train(
        name: &str,
        features: &FeatureSet,
        metric: Metric,
        config: &KMedoidsConfig,
    ) -> Result<Self> {
        let clusterer = MedoidClusterer::new(config.clone());
        let clustering = clusterer.fit(features, metric)?;
        crate::metrics::TRAINING_RUNS_TOTAL.inc();
        Self::from_clustering(name, features, metric, &clustering)
    }

    /// Materialize the medoids of `clustering` out of its training set.
    pub fn from_clustering(
        name: &str,
        features: &FeatureSet,
        metric: Metric,
        clustering: &Clustering,
    ) -> Result<Self> {
        let mut words = Vec::with_capacity(clustering.medoids.len());
        for &m in &clustering.medoids {
            if m >= features.len() {
                return Err(MosaicError::Validation(format!(
                    "medoid index {m} out of range for {} samples",
                    features.len()
                )));
            }
            words.push(features.row(m).to_vec());
        }

        info!(
            name,
            words = words.len(),
            iterations = clustering.iterations,
            converged = clustering.converged(),
            "materialized visual vocabulary"
        );

        Ok(Self {
            id: Ulid::new(),
            name: name.to_string(),
            metric,
            dim: features.dim(),
            words,
            iterations: clustering.iterations,
            converged: clustering.converged(),
            trained_at: Utc::now(),
        })
    }

    /// Build a vocabulary from explicit word descriptors.
    pub fn from_words(name: &str, metric: Metric, words: Vec<Vec<f32>>) -> Result<Self> {
        let dim = words.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = words.iter().find(|w| w.len() != dim) {
            return Err(MosaicError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }
        Ok(Self {
            id: Ulid::new(),
            name: name.to_string(),
            metric,
            dim,
            words,
            iterations: 0,
            converged: true,
            trained_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Descriptor width.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of visual words (K).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, id: WordId) -> Option<&[f32]> {
        self.words.get(id).map(Vec::as_slice)
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// The word whose medoid is nearest to `descriptor`; ties go to the
    /// lowest word id.
    pub fn nearest_word(&self, descriptor: &[f32]) -> Result<WordId> {
        self.check_fitted()?;
        self.check_width(descriptor.len())?;
        Ok(self.nearest_unchecked(descriptor))
    }

    /// Raw per-word descriptor counts for `features`.
    pub fn word_counts(&self, features: &FeatureSet) -> Result<Vec<u32>> {
        self.check_fitted()?;
        let mut counts = vec![0u32; self.words.len()];
        if features.is_empty() {
            return Ok(counts);
        }
        self.check_width(features.dim())?;
        for row in features.rows() {
            counts[self.nearest_unchecked(row)] += 1;
        }
        Ok(counts)
    }

    /// Quantize `features` into a frequency histogram over the vocabulary.
    #[instrument(skip(self, features), fields(vocabulary = %self.name, n = features.len()))]
    pub fn compute(&self, features: &FeatureSet) -> Result<Histogram> {
        let counts = self.word_counts(features)?;
        let histogram = Histogram::from_counts(&counts, features.len());
        debug!(
            nonzero_words = histogram.nonzero_words().count(),
            "computed histogram"
        );
        Ok(histogram)
    }

    fn nearest_unchecked(&self, descriptor: &[f32]) -> WordId {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (id, word) in self.words.iter().enumerate() {
            let d = match self.metric {
                Metric::Euclidean => squared_euclidean_distance(descriptor, word),
                Metric::Hamming => hamming_distance(descriptor, word),
            };
            if d < best_dist {
                best_dist = d;
                best = id;
            }
        }
        best
    }

    fn check_fitted(&self) -> Result<()> {
        if self.words.is_empty() {
            return Err(MosaicError::NotFitted(format!(
                "vocabulary '{}' has no words",
                self.name
            )));
        }
        Ok(())
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.dim {
            return Err(MosaicError::DimensionMismatch {
                expected: self.dim,
                actual: width,
            });
        }
        Ok(())
    }

    // --- Persistence ---

    /// Object-store key for the vocabulary named `name`.
    pub fn storage_key(name: &str) -> String {
        format!("{VOCABULARY_PREFIX}/{name}/vocabulary.bin")
    }

    /// Serialize to one opaque, checksummed blob.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let payload = bincode::serialize(self)?;
        let blob = VocabularyBlob {
            version: BLOB_FORMAT_VERSION,
            checksum: xxh3_64(&payload),
            payload,
        };
        Ok(Bytes::from(bincode::serialize(&blob)?))
    }

    /// Deserialize a blob written by `to_bytes`, verifying its checksum.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let blob: VocabularyBlob = bincode::deserialize(data)?;
        if blob.version != BLOB_FORMAT_VERSION {
            return Err(MosaicError::Validation(format!(
                "unsupported vocabulary format version {}",
                blob.version
            )));
        }
        let actual = xxh3_64(&blob.payload);
        if actual != blob.checksum {
            return Err(MosaicError::ChecksumMismatch {
                expected: blob.checksum,
                actual,
            });
        }
        Ok(bincode::deserialize(&blob.payload)?)
    }

    /// Write the vocabulary to storage, replacing any previous one with the
    /// same name.
    #[instrument(skip(self, store), fields(name = %self.name, words = self.words.len()))]
    pub async fn save(&self, store: &MosaicStore) -> Result<()> {
        let data = self.to_bytes()?;
        let bytes = data.len();
        store.put(&Self::storage_key(&self.name), data).await?;
        info!(id = %self.id, bytes, "saved vocabulary");
        Ok(())
    }

    /// Names of every vocabulary saved in `store`, sorted.
    pub async fn list_names(store: &MosaicStore) -> Result<Vec<String>> {
        let mut names: Vec<String> = store
            .list_prefix(VOCABULARY_PREFIX)
            .await?
            .iter()
            .filter_map(|key| {
                key.strip_prefix(VOCABULARY_PREFIX)?
                    .strip_prefix('/')?
                    .strip_suffix("/vocabulary.bin")
                    .map(str::to_string)
            })
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Read the vocabulary named `name`. Returns `None` if none was saved.
    #[instrument(skip(store))]
    pub async fn load(store: &MosaicStore, name: &str) -> Result<Option<Self>> {
        match store.get(&Self::storage_key(name)).await {
            Ok(data) => Ok(Some(Self::from_bytes(&data)?)),
            Err(MosaicError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
