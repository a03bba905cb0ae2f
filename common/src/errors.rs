// Error handling framework for the image-edit worker

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Request envelope validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid JSON envelope: {0}")]
    InvalidJson(String),
}

/// Blob storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("MinIO error: {0}")]
    MinioError(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

/// Image transformation errors
#[derive(Error, Debug)]
pub enum TransformError {
    /// Message reported by the provider, passed through verbatim
    #[error("{0}")]
    Provider(String),

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Source image could not be prepared: {0}")]
    InvalidImage(String),
}

/// Queue-related errors
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to connect to queue: {0}")]
    Connection(String),

    #[error("Failed to create stream: {0}")]
    StreamCreation(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Failed to create consumer: {0}")]
    ConsumerCreation(String),

    #[error("Failed to publish message: {0}")]
    PublishFailed(String),

    #[error("Failed to consume message: {0}")]
    ConsumeFailed(String),

    #[error("Failed to acknowledge message: {0}")]
    AckFailed(String),

    #[error("Message serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Message deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Queue operation timeout: {0}")]
    Timeout(String),
}

/// Failure category reported to callers in the `errorKind` reply field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    FetchError,
    TransformError,
    StoreError,
    PublishError,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::FetchError => "FetchError",
            ErrorKind::TransformError => "TransformError",
            ErrorKind::StoreError => "StoreError",
            ErrorKind::PublishError => "PublishError",
            ErrorKind::UnknownError => "UnknownError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job pipeline errors, one variant per stage.
///
/// The display text is what the caller sees in the reply's `error` field, so
/// each variant forwards its source message unchanged.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Fetch(StorageError),

    #[error("{0}")]
    Transform(#[from] TransformError),

    #[error("{0}")]
    Store(StorageError),

    #[error("{0}")]
    Publish(QueueError),

    #[error("{0}")]
    Unknown(String),
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::Validation(_) => ErrorKind::ValidationError,
            JobError::Fetch(_) => ErrorKind::FetchError,
            JobError::Transform(_) => ErrorKind::TransformError,
            JobError::Store(_) => ErrorKind::StoreError,
            JobError::Publish(_) => ErrorKind::PublishError,
            JobError::Unknown(_) => ErrorKind::UnknownError,
        }
    }
}
