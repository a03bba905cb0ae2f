// MinIO storage client and connection management

use crate::config::MinioConfig;
use crate::errors::StorageError;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// MinIO client wrapper, cheap to clone
#[derive(Clone, Debug)]
pub struct MinioClient {
    bucket: Arc<Bucket>,
}

impl MinioClient {
    /// Create a new MinIO client from configuration
    #[instrument(skip(config), fields(endpoint = %config.endpoint, bucket = %config.bucket))]
    pub async fn new(config: &MinioConfig) -> Result<Self, StorageError> {
        info!("Initializing MinIO client");

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| {
            error!(error = %e, "Failed to create MinIO credentials");
            StorageError::MinioError(format!("Failed to create credentials: {}", e))
        })?;

        // Keep the scheme: rust-s3 falls back to https without one
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| {
                error!(error = %e, "Failed to create MinIO bucket");
                StorageError::MinioError(format!("Failed to create bucket: {}", e))
            })?
            .with_path_style();

        info!(
            bucket = %config.bucket,
            endpoint = %config.endpoint,
            "MinIO client initialized successfully"
        );

        Ok(Self {
            bucket: Arc::from(bucket),
        })
    }

    /// Health check for MinIO connection
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), StorageError> {
        debug!("Performing MinIO health check");

        match self
            .bucket
            .list("".to_string(), Some("/".to_string()))
            .await
        {
            Ok(_) => {
                debug!("MinIO health check passed");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "MinIO health check failed");
                Err(StorageError::ConnectionFailed(format!(
                    "Health check failed: {}",
                    e
                )))
            }
        }
    }

    /// Store data under `path` with an explicit content type
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    pub async fn put_object(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        debug!("Storing object to MinIO");

        let response = self
            .bucket
            .put_object_with_content_type(path, data, content_type)
            .await
            .map_err(|e| {
                error!(error = %e, path = %path, "Failed to store object to MinIO");
                StorageError::MinioError(format!("Failed to put object '{}': {}", path, e))
            })?;

        check_status(path, response.status_code(), "put")?;

        debug!(path = %path, "Object stored successfully");
        Ok(())
    }

    /// Retrieve data from MinIO at the specified path
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get_object(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        debug!("Retrieving object from MinIO");

        let response = self.bucket.get_object(path).await.map_err(|e| {
            error!(error = %e, path = %path, "Failed to retrieve object from MinIO");
            StorageError::MinioError(format!("Failed to get object '{}': {}", path, e))
        })?;

        check_status(path, response.status_code(), "get")?;

        let data = response.bytes().to_vec();
        debug!(path = %path, size = data.len(), "Object retrieved successfully");
        Ok(data)
    }
}

/// rust-s3 is built without `fail-on-err`, so non-2xx responses arrive as Ok
fn check_status(path: &str, status: u16, op: &str) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(path.to_string())),
        code => Err(StorageError::MinioError(format!(
            "Failed to {} object '{}': status {}",
            op, path, code
        ))),
    }
}
