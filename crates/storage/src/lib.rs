//! Object storage for generated post images.
//!
//! [`ImageStore`] is the seam the API and the publishing pipeline talk to.
//! Production uses [`S3ImageStore`]; tests and local runs without AWS
//! credentials use [`MemoryImageStore`].

pub mod config;
pub mod memory;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;

pub use config::{StorageBackend, StorageConfig};
pub use memory::MemoryImageStore;
pub use s3::S3ImageStore;

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Store for image bytes keyed by [`inkwell_core`]-derived object keys.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload `bytes` under `key`, returning the object's public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StorageError>;

    /// Download the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Public URL for `key` (does not check existence).
    fn public_url(&self, key: &str) -> String;
}

/// Build the configured store.
pub async fn build_store(config: &StorageConfig) -> Arc<dyn ImageStore> {
    match &config.backend {
        StorageBackend::S3 { bucket } => {
            tracing::info!(bucket = %bucket, "Using S3 image storage");
            Arc::new(S3ImageStore::from_env(bucket.clone(), config.public_base_url.clone()).await)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory image storage; uploads are lost on restart");
            Arc::new(MemoryImageStore::new(config.public_base_url.clone()))
        }
    }
}
