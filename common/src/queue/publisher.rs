// Reply publisher: sends job results back to the caller's reply subject

use crate::errors::QueueError;
use crate::models::{JobResult, CORRELATION_ID_HEADER};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// ReplyPublisher trait for delivering job results
#[async_trait]
pub trait ReplyPublisher: Send + Sync {
    /// Send `result` to `reply_to`, tagged with the result's correlation id.
    ///
    /// Called once per job and never retried.
    async fn publish(&self, reply_to: &str, result: &JobResult) -> Result<(), QueueError>;
}

/// Core NATS reply publisher.
///
/// Replies go out on core NATS so they reach plain inbox subscribers; when
/// `reply_to` is the default response subject the response stream captures
/// them.
pub struct NatsReplyPublisher {
    client: async_nats::Client,
}

impl NatsReplyPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReplyPublisher for NatsReplyPublisher {
    #[instrument(skip(self, result), fields(
        reply_to = %reply_to,
        correlation_id = %result.correlation_id(),
        success = result.is_success()
    ))]
    async fn publish(&self, reply_to: &str, result: &JobResult) -> Result<(), QueueError> {
        let payload = serde_json::to_vec(result).map_err(|e| {
            QueueError::SerializationFailed(format!("Failed to serialize reply: {}", e))
        })?;

        let mut headers = async_nats::HeaderMap::new();
        headers.insert(CORRELATION_ID_HEADER, result.correlation_id());

        self.client
            .publish_with_headers(reply_to.to_string(), headers, payload.into())
            .await
            .map_err(|e| QueueError::PublishFailed(format!("Failed to publish reply: {}", e)))?;

        // Connection failures only surface on flush
        self.client
            .flush()
            .await
            .map_err(|e| QueueError::PublishFailed(format!("Failed to flush reply: {}", e)))?;

        debug!("Reply published");
        Ok(())
    }
}
