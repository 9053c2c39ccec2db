use rusqlite::params;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::features::FeatureSet;
use crate::types::{AddOutcome, DocId};
use crate::vocabulary::Histogram;

use super::InvertedIndex;

impl InvertedIndex {
    /// Quantize `features` and add the document under `name`.
    ///
    /// Adding a name that is already indexed is a no-op that reports the
    /// existing id, even when `features` differ from the first call.
    #[instrument(skip(self, features), fields(n = features.len()))]
    pub fn add_document(&mut self, name: &str, features: &FeatureSet) -> Result<AddOutcome> {
        if let Some(doc_id) = self.doc_id(name)? {
            return Ok(self.skipped(name, doc_id));
        }
        let histogram = self.vocabulary.compute(features)?;
        self.add_histogram(name, &histogram)
    }

    /// Add a document from an already computed histogram.
    pub fn add_histogram(&mut self, name: &str, histogram: &Histogram) -> Result<AddOutcome> {
        if histogram.len() != self.vocabulary.len() {
            return Err(crate::error::MosaicError::DimensionMismatch {
                expected: self.vocabulary.len(),
                actual: histogram.len(),
            });
        }

        let blob = histogram.to_bytes()?;
        let vocabulary = self.vocabulary.name().to_string();

        let tx = self.conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO documents (name) VALUES (?1)",
            params![name],
        )?;
        let doc_id: DocId = tx.query_row(
            "SELECT doc_id FROM documents WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        if inserted == 0 {
            // Already present; nothing was written.
            drop(tx);
            return Ok(self.skipped(name, doc_id));
        }

        let mut words = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO postings (doc_id, word_id, vocabulary) VALUES (?1, ?2, ?3)",
            )?;
            for word in histogram.nonzero_words() {
                stmt.execute(params![doc_id, word as i64, vocabulary])?;
                words += 1;
            }
        }
        tx.execute(
            "INSERT INTO histograms (doc_id, histogram, vocabulary) VALUES (?1, ?2, ?3)",
            params![doc_id, blob, vocabulary],
        )?;
        tx.commit()?;

        crate::metrics::DOCUMENTS_TOTAL
            .with_label_values(&["indexed"])
            .inc();
        info!(name, doc_id, words, "indexed document");

        Ok(AddOutcome::Indexed { doc_id, words })
    }

    fn skipped(&self, name: &str, doc_id: DocId) -> AddOutcome {
        crate::metrics::DOCUMENTS_TOTAL
            .with_label_values(&["skipped"])
            .inc();
        debug!(name, doc_id, "document already indexed, skipping");
        AddOutcome::Skipped { doc_id }
    }
}
