use thiserror::Error;

#[derive(Error, Debug)]
pub enum MosaicError {
    // Configuration errors (fatal, raised before any computation)
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("vocabulary not fitted: {0}")]
    NotFitted(String),

    // Index store errors
    #[error("index storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    // Blob storage errors
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("object store path error: {0}")]
    ObjectStorePath(#[from] object_store::path::Error),

    // Serialization errors
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode serialization error: {0}")]
    Bincode(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    // Lookup errors
    #[error("document not found: {name}")]
    DocumentNotFound { name: String },

    // Validation errors
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("validation error: {0}")]
    Validation(String),

    // IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // Internal
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<Box<bincode::ErrorKind>> for MosaicError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        MosaicError::Bincode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MosaicError>;

impl MosaicError {
    pub fn status_code(&self) -> u16 {
        match self {
            MosaicError::NotFound { .. } | MosaicError::DocumentNotFound { .. } => 404,

            MosaicError::Configuration(_)
            | MosaicError::DimensionMismatch { .. }
            | MosaicError::Validation(_) => 400,

            MosaicError::NotFitted(_) => 503,

            _ => 500,
        }
    }
}
