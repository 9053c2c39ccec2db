use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{MosaicError, Result};
use crate::vocabulary::VisualVocabulary;

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        doc_id INTEGER PRIMARY KEY,
        name   TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS postings (
        doc_id     INTEGER NOT NULL REFERENCES documents(doc_id),
        word_id    INTEGER NOT NULL,
        vocabulary TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS histograms (
        doc_id     INTEGER PRIMARY KEY REFERENCES documents(doc_id),
        histogram  BLOB NOT NULL,
        vocabulary TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS index_meta (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS postings_word_idx ON postings(word_id);
    CREATE INDEX IF NOT EXISTS postings_doc_idx ON postings(doc_id);
";

const META_VOCABULARY_NAME: &str = "vocabulary_name";
const META_VOCABULARY_ID: &str = "vocabulary_id";
const META_VOCABULARY_WORDS: &str = "vocabulary_words";

/// Create the tables if they do not exist yet.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

/// Bind the index to `vocabulary` on first open, and refuse to reopen it
/// with any other vocabulary.
pub fn bind_vocabulary(conn: &Connection, vocabulary: &VisualVocabulary) -> Result<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = ?1",
            params![META_VOCABULARY_ID],
            |row| row.get(0),
        )
        .optional()?;

    let id = vocabulary.id().to_string();
    match stored {
        Some(existing) if existing == id => Ok(()),
        Some(existing) => Err(MosaicError::Configuration(format!(
            "index was built with vocabulary {existing}, not '{}' ({id})",
            vocabulary.name()
        ))),
        None => {
            let mut stmt =
                conn.prepare("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")?;
            stmt.execute(params![META_VOCABULARY_NAME, vocabulary.name()])?;
            stmt.execute(params![META_VOCABULARY_ID, id])?;
            stmt.execute(params![META_VOCABULARY_WORDS, vocabulary.len().to_string()])?;
            debug!(vocabulary = vocabulary.name(), %id, "bound index to vocabulary");
            Ok(())
        }
    }
}
