pub mod handlers;
pub mod routes;

use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::{MosaicError, Result};
use crate::index::InvertedIndex;
use crate::vocabulary::VisualVocabulary;

/// Shared application state injected into all handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` until a vocabulary has been trained and saved.
    pub vocabulary: Option<Arc<VisualVocabulary>>,
    pub index: Option<Arc<Mutex<InvertedIndex>>>,
}

impl AppState {
    /// State for a service with an open index.
    pub fn new(config: Arc<Config>, index: InvertedIndex) -> Self {
        let vocabulary = Some(index.vocabulary().clone());
        Self {
            config,
            vocabulary,
            index: Some(Arc::new(Mutex::new(index))),
        }
    }

    /// State for a service started before any vocabulary exists. Every
    /// vocabulary-dependent route answers 503.
    pub fn unfitted(config: Arc<Config>) -> Self {
        Self {
            config,
            vocabulary: None,
            index: None,
        }
    }

    pub fn vocabulary(&self) -> Result<&Arc<VisualVocabulary>> {
        self.vocabulary.as_ref().ok_or_else(|| self.not_fitted())
    }

    pub fn index(&self) -> Result<Arc<Mutex<InvertedIndex>>> {
        self.index.clone().ok_or_else(|| self.not_fitted())
    }

    fn not_fitted(&self) -> MosaicError {
        MosaicError::NotFitted(format!(
            "no vocabulary named '{}' has been trained",
            self.config.index.vocabulary
        ))
    }
}

/// Run `f` against the index on the blocking pool.
pub async fn with_index<T, F>(index: Arc<Mutex<InvertedIndex>>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut InvertedIndex) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = index
            .lock()
            .map_err(|_| MosaicError::Internal("index lock poisoned".into()))?;
        f(&mut guard)
    })
    .await
    .map_err(|e| MosaicError::Internal(format!("index task failed: {e}")))?
}
