//! Persistent inverted index over visual words.
//!
//! Three tables back the index: `documents` (name to surrogate id),
//! `postings` (one row per document and nonzero word) and `histograms`
//! (the full histogram for exact re-ranking). A document's rows are written
//! in one transaction, so readers never see a half-indexed document.

pub mod build;
pub mod schema;
pub mod search;

use std::path::Path;
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, instrument};

use crate::error::{MosaicError, Result};
use crate::types::DocId;
use crate::vocabulary::{Histogram, VisualVocabulary};

pub use search::QueryOptions;

/// Inverted index bound to one visual vocabulary.
///
/// Single writer: mutating calls take `&mut self`. The connection is
/// `Send` but not `Sync`, so shared use goes through a mutex.
pub struct InvertedIndex {
    conn: Connection,
    vocabulary: Arc<VisualVocabulary>,
}

impl InvertedIndex {
    /// Open (or create) an index file.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), vocabulary = vocabulary.name()))]
    pub fn open(path: impl AsRef<Path>, vocabulary: Arc<VisualVocabulary>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::init(conn, vocabulary)
    }

    /// Open an index that lives only as long as this value.
    pub fn open_in_memory(vocabulary: Arc<VisualVocabulary>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::init(conn, vocabulary)
    }

    fn init(conn: Connection, vocabulary: Arc<VisualVocabulary>) -> Result<Self> {
        if vocabulary.is_empty() {
            return Err(MosaicError::NotFitted(format!(
                "vocabulary '{}' has no words",
                vocabulary.name()
            )));
        }
        schema::create_tables(&conn)?;
        schema::bind_vocabulary(&conn, &vocabulary)?;
        debug!(words = vocabulary.len(), "opened inverted index");
        Ok(Self { conn, vocabulary })
    }

    pub fn vocabulary(&self) -> &Arc<VisualVocabulary> {
        &self.vocabulary
    }

    /// Whether a document with this name has been added.
    pub fn is_indexed(&self, name: &str) -> Result<bool> {
        Ok(self.doc_id(name)?.is_some())
    }

    pub fn doc_id(&self, name: &str) -> Result<Option<DocId>> {
        Ok(self
            .conn
            .prepare_cached("SELECT doc_id FROM documents WHERE name = ?1")?
            .query_row(params![name], |row| row.get(0))
            .optional()?)
    }

    pub fn document_name(&self, doc_id: DocId) -> Result<Option<String>> {
        Ok(self
            .conn
            .prepare_cached("SELECT name FROM documents WHERE doc_id = ?1")?
            .query_row(params![doc_id], |row| row.get(0))
            .optional()?)
    }

    /// The stored histogram of a document.
    pub fn histogram(&self, doc_id: DocId) -> Result<Option<Histogram>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .prepare_cached("SELECT histogram FROM histograms WHERE doc_id = ?1")?
            .query_row(params![doc_id], |row| row.get(0))
            .optional()?;
        blob.map(|b| Histogram::from_bytes(&b)).transpose()
    }

    pub fn document_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn posting_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM postings", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn histogram_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM histograms", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
