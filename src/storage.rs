//! Object-store access for persisted artifacts (the vocabulary blob).

use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use tracing::{debug, instrument};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{MosaicError, Result};

/// Thin wrapper over an `ObjectStore` that maps missing keys to
/// `MosaicError::NotFound` and speaks `Bytes`.
#[derive(Clone)]
pub struct MosaicStore {
    inner: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for MosaicStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MosaicStore({})", self.inner)
    }
}

impl MosaicStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// An in-process store, used by tests and throwaway runs.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Build the backend selected by `config`.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match config.backend {
            StorageBackend::Memory => Arc::new(InMemory::new()),
            StorageBackend::Local => {
                std::fs::create_dir_all(&config.root)?;
                Arc::new(LocalFileSystem::new_with_prefix(&config.root)?)
            }
            StorageBackend::S3 => {
                let bucket = config.bucket.as_deref().ok_or_else(|| {
                    MosaicError::Configuration("storage.bucket is required for s3".into())
                })?;
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(ref region) = config.region {
                    builder = builder.with_region(region);
                }
                if let Some(ref endpoint) = config.endpoint {
                    builder = builder.with_endpoint(endpoint).with_allow_http(true);
                }
                Arc::new(builder.build()?)
            }
        };
        debug!(backend = ?config.backend, "initialized object store");
        Ok(Self::new(inner))
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = Path::parse(key)?;
        self.inner.put(&path, PutPayload::from(data)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let path = Path::parse(key)?;
        match self.inner.get(&path).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => Err(MosaicError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta> {
        let path = Path::parse(key)?;
        match self.inner.head(&path).await {
            Ok(meta) => Ok(meta),
            Err(object_store::Error::NotFound { .. }) => Err(MosaicError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(MosaicError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List every key under `prefix`.
    pub async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let path = Path::parse(prefix)?;
        let metas: Vec<ObjectMeta> = self.inner.list(Some(&path)).try_collect().await?;
        Ok(metas.into_iter().map(|m| m.location.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_put_get_list() {
        let store = MosaicStore::in_memory();
        assert!(!store.exists("a/b.bin").await.unwrap());
        assert!(matches!(
            store.get("a/b.bin").await,
            Err(MosaicError::NotFound { .. })
        ));

        store.put("a/b.bin", Bytes::from_static(b"xyz")).await.unwrap();

        assert_eq!(store.get("a/b.bin").await.unwrap(), Bytes::from_static(b"xyz"));
        assert!(store.exists("a/b.bin").await.unwrap());
        assert_eq!(store.list_prefix("a").await.unwrap(), vec!["a/b.bin".to_string()]);
        assert!(store.list_prefix("z").await.unwrap().is_empty());
    }
}
