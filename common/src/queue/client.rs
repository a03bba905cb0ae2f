// Caller-side client: submit an edit request and wait for the correlated reply

use crate::errors::QueueError;
use crate::models::{JobResult, RequestEnvelope, CORRELATION_ID_HEADER, REPLY_TO_HEADER};
use crate::queue::nats::{header_value, NatsClient};
use async_nats::jetstream::Context as JetStreamContext;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Publishes requests into the request stream and awaits replies on a
/// private inbox
pub struct EditRequestClient {
    client: async_nats::Client,
    jetstream: JetStreamContext,
    request_subject: String,
    reply_timeout: Duration,
}

impl EditRequestClient {
    pub fn new(nats: &NatsClient) -> Self {
        Self {
            client: nats.client().clone(),
            jetstream: nats.jetstream().clone(),
            request_subject: nats.config().request_subject.clone(),
            reply_timeout: Duration::from_secs(nats.config().reply_timeout_seconds),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Submit one edit request and wait for its reply.
    ///
    /// Replies carrying another correlation id are skipped. Gives up with
    /// [`QueueError::Timeout`] once the reply timeout elapses.
    #[instrument(skip_all, fields(blob_key = %blob_key, correlation_id = tracing::field::Empty))]
    pub async fn submit(&self, blob_key: &str, prompt: &str) -> Result<JobResult, QueueError> {
        let correlation_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("correlation_id", correlation_id.as_str());

        let inbox = self.client.new_inbox();
        let mut replies = self.client.subscribe(inbox.clone()).await.map_err(|e| {
            QueueError::ConsumeFailed(format!("Failed to subscribe to reply inbox: {}", e))
        })?;

        let envelope = RequestEnvelope {
            blob_key: Some(blob_key.to_string()),
            prompt: Some(prompt.to_string()),
            correlation_id: Some(serde_json::Value::String(correlation_id.clone())),
            ..Default::default()
        };
        let payload = serde_json::to_vec(&envelope).map_err(|e| {
            QueueError::SerializationFailed(format!("Failed to serialize request: {}", e))
        })?;

        let mut headers = async_nats::HeaderMap::new();
        headers.insert(CORRELATION_ID_HEADER, correlation_id.as_str());
        headers.insert(REPLY_TO_HEADER, inbox.as_str());

        let ack = self
            .jetstream
            .publish_with_headers(self.request_subject.clone(), headers, payload.into())
            .await
            .map_err(|e| QueueError::PublishFailed(format!("Failed to publish request: {}", e)))?;
        ack.await.map_err(|e| {
            QueueError::PublishFailed(format!("Failed to get publish acknowledgment: {}", e))
        })?;

        info!("Edit request published, waiting for reply");

        let wait = async {
            while let Some(message) = replies.next().await {
                let reply_id = header_value(message.headers.as_ref(), CORRELATION_ID_HEADER);
                if reply_id.as_deref() != Some(correlation_id.as_str()) {
                    debug!(reply_id = ?reply_id, "Ignoring reply for another request");
                    continue;
                }

                return serde_json::from_slice::<JobResult>(&message.payload).map_err(|e| {
                    QueueError::DeserializationFailed(format!("Failed to decode reply: {}", e))
                });
            }

            Err(QueueError::ConsumeFailed(
                "reply subscription closed".to_string(),
            ))
        };

        tokio::time::timeout(self.reply_timeout, wait)
            .await
            .map_err(|_| {
                QueueError::Timeout(format!(
                    "No reply for {} after {:?}",
                    correlation_id, self.reply_timeout
                ))
            })?
    }
}
