use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use mosaic::config::{Config, StorageBackend};
use mosaic::index::InvertedIndex;
use mosaic::storage::MosaicStore;
use mosaic::types::Metric;
use mosaic::vocabulary::VisualVocabulary;

use super::features::corner_words;

/// Scratch environment for one test: a local object store and an index
/// path under a temporary directory that is removed on drop.
pub struct TestHarness {
    pub dir: TempDir,
    pub store: MosaicStore,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Local;
        config.storage.root = dir.path().join("artifacts");
        config.index.path = dir.path().join("index.db");
        config.index.vocabulary = "test".to_string();
        let store = MosaicStore::from_config(&config.storage).unwrap();
        Self { dir, store, config }
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.index.path.clone()
    }

    /// A four-word 2-D vocabulary at the corners of a 10x10 square.
    pub fn corner_vocabulary(&self) -> Arc<VisualVocabulary> {
        Arc::new(
            VisualVocabulary::from_words(&self.config.index.vocabulary, Metric::Euclidean, corner_words())
                .unwrap(),
        )
    }

    pub fn open_index(&self, vocabulary: Arc<VisualVocabulary>) -> InvertedIndex {
        InvertedIndex::open(self.index_path(), vocabulary).unwrap()
    }
}
