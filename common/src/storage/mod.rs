// Storage module for MinIO / S3 blob storage

pub mod minio;
pub mod service;

pub use minio::MinioClient;
pub use service::{BlobStore, MinioBlobStore};

#[cfg(test)]
pub use service::MockBlobStore;
