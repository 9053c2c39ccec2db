//! Two-stage similarity search: posting-list prefilter, then exact
//! re-ranking of the shortlist by histogram distance.

use std::collections::HashMap;
use std::time::Instant;

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{MosaicError, Result};
use crate::features::FeatureSet;
use crate::types::{Candidate, DocId, QueryHit, WordId};
use crate::vocabulary::Histogram;

use super::InvertedIndex;

/// Knobs for a similarity query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Keep at most this many re-ranked hits.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Re-rank only the first this-many prefilter candidates.
    #[serde(default)]
    pub max_candidates: Option<usize>,
    /// Drop the queried document from its own results.
    #[serde(default)]
    pub exclude_self: bool,
}

impl InvertedIndex {
    /// Ids of every document posting `word`, ascending.
    pub fn candidates_from_word(&self, word: WordId) -> Result<Vec<DocId>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT doc_id FROM postings WHERE word_id = ?1 ORDER BY doc_id",
        )?;
        let ids = stmt
            .query_map(params![word as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<DocId>>>()?;
        Ok(ids)
    }

    /// Documents sharing at least one word with `histogram`, most shared
    /// words first (ties by ascending id).
    pub fn candidates_from_histogram(&self, histogram: &Histogram) -> Result<Vec<Candidate>> {
        self.check_histogram(histogram)?;

        let mut shared: HashMap<DocId, usize> = HashMap::new();
        for word in histogram.nonzero_words() {
            for doc_id in self.candidates_from_word(word)? {
                *shared.entry(doc_id).or_insert(0) += 1;
            }
        }

        let mut candidates: Vec<Candidate> = shared
            .into_iter()
            .map(|(doc_id, shared_words)| Candidate {
                doc_id,
                shared_words,
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.shared_words
                .cmp(&a.shared_words)
                .then(a.doc_id.cmp(&b.doc_id))
        });
        Ok(candidates)
    }

    /// Documents most similar to the indexed document `name`, nearest
    /// first. The document itself is included at distance 0 unless
    /// `exclude_self` is set.
    #[instrument(skip(self, options))]
    pub fn query(&self, name: &str, options: &QueryOptions) -> Result<Vec<QueryHit>> {
        let doc_id = self
            .doc_id(name)?
            .ok_or_else(|| MosaicError::DocumentNotFound {
                name: name.to_string(),
            })?;
        let histogram = self.histogram(doc_id)?.ok_or_else(|| {
            MosaicError::Internal(format!("document {doc_id} has no stored histogram"))
        })?;
        let exclude = options.exclude_self.then_some(doc_id);
        self.rerank(&histogram, options, exclude, "document")
    }

    /// Documents most similar to an arbitrary histogram, nearest first.
    pub fn query_histogram(
        &self,
        histogram: &Histogram,
        options: &QueryOptions,
    ) -> Result<Vec<QueryHit>> {
        self.check_histogram(histogram)?;
        self.rerank(histogram, options, None, "histogram")
    }

    /// Quantize `features` and search for similar documents, nearest first.
    pub fn query_features(
        &self,
        features: &FeatureSet,
        options: &QueryOptions,
    ) -> Result<Vec<QueryHit>> {
        let histogram = self.vocabulary.compute(features)?;
        self.rerank(&histogram, options, None, "features")
    }

    fn rerank(
        &self,
        histogram: &Histogram,
        options: &QueryOptions,
        exclude: Option<DocId>,
        kind: &str,
    ) -> Result<Vec<QueryHit>> {
        let start = Instant::now();
        crate::metrics::QUERIES_TOTAL.with_label_values(&[kind]).inc();

        let mut candidates = self.candidates_from_histogram(histogram)?;
        let prefiltered = candidates.len();
        crate::metrics::PREFILTER_CANDIDATES
            .with_label_values(&[kind])
            .observe(prefiltered as f64);
        if let Some(max) = options.max_candidates {
            candidates.truncate(max);
        }

        let mut stmt = self.conn.prepare_cached(
            "SELECT d.name, h.histogram FROM histograms h \
             JOIN documents d ON d.doc_id = h.doc_id WHERE h.doc_id = ?1",
        )?;

        let mut hits = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if exclude == Some(candidate.doc_id) {
                continue;
            }
            let row: Option<(String, Vec<u8>)> = stmt
                .query_row(params![candidate.doc_id], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .optional()?;
            let Some((name, blob)) = row else {
                continue;
            };
            let stored = Histogram::from_bytes(&blob)?;
            hits.push(QueryHit {
                doc_id: candidate.doc_id,
                name,
                distance: histogram.distance(&stored)?,
            });
        }

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.doc_id.cmp(&b.doc_id))
        });
        if let Some(limit) = options.limit {
            hits.truncate(limit);
        }

        let elapsed = start.elapsed();
        crate::metrics::QUERY_DURATION
            .with_label_values(&[kind])
            .observe(elapsed.as_secs_f64());
        debug!(
            kind,
            prefiltered,
            reranked = candidates.len(),
            hits = hits.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "query complete"
        );

        Ok(hits)
    }

    fn check_histogram(&self, histogram: &Histogram) -> Result<()> {
        if histogram.len() != self.vocabulary.len() {
            return Err(MosaicError::DimensionMismatch {
                expected: self.vocabulary.len(),
                actual: histogram.len(),
            });
        }
        Ok(())
    }
}
