// Blob store seam used by the job processor

use crate::errors::StorageError;
use crate::storage::MinioClient;
use async_trait::async_trait;
use tracing::{info, instrument};

/// Key-addressed byte storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Load the bytes stored under `key`
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Store `data` under `key` with the given content type
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;
}

/// MinIO / S3 backed blob store
pub struct MinioBlobStore {
    client: MinioClient,
}

impl MinioBlobStore {
    pub fn new(client: MinioClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for MinioBlobStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let data = self.client.get_object(key).await?;
        info!(size = data.len(), "Loaded source blob");
        Ok(data)
    }

    #[instrument(skip(self, data), fields(key = %key, size = data.len()))]
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.client.put_object(key, data, content_type).await?;
        info!(content_type = content_type, "Stored output blob");
        Ok(())
    }
}
