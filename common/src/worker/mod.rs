// Worker module: wires the broker, job processor and reply publisher together

pub mod processor;

use crate::config::WorkerConfig;
use crate::errors::QueueError;
use crate::queue::{EditRequestConsumer, NatsClient, NatsReplyPublisher};
use crate::storage::BlobStore;
use crate::transform::ImageTransformer;
use std::sync::Arc;
use tracing::{info, instrument};

pub use processor::{output_key, JobProcessor};

/// Image-edit worker owning the broker connection.
///
/// Client handles are created once by the caller and passed in; nothing here
/// is global.
pub struct EditWorker {
    nats_client: NatsClient,
    consumer: EditRequestConsumer,
}

impl EditWorker {
    /// Declare the queues and build the consumer
    #[instrument(skip_all)]
    pub async fn new(
        nats_client: NatsClient,
        blob_store: Arc<dyn BlobStore>,
        transformer: Arc<dyn ImageTransformer>,
        config: &WorkerConfig,
    ) -> Result<Self, QueueError> {
        info!("Creating image edit worker");

        nats_client.initialize_streams().await?;

        let processor = Arc::new(JobProcessor::new(blob_store, transformer, config));
        let publisher = Arc::new(NatsReplyPublisher::new(nats_client.client().clone()));
        let consumer = EditRequestConsumer::new(
            processor.into_handler(),
            publisher,
            nats_client.config().response_subject.clone(),
        );

        Ok(Self {
            nats_client,
            consumer,
        })
    }

    /// Consume requests until shutdown or a fatal broker error
    pub async fn start(&self) -> Result<(), QueueError> {
        info!("Starting image edit worker");

        let consumer = self.nats_client.get_or_create_consumer().await?;
        let messages = consumer
            .stream()
            .max_messages_per_batch(1)
            .messages()
            .await
            .map_err(|e| {
                QueueError::ConsumeFailed(format!("Failed to create message stream: {}", e))
            })?;

        self.consumer.run(messages).await
    }

    /// Request graceful shutdown
    pub fn shutdown(&self) {
        info!("Requesting worker shutdown");
        self.consumer.shutdown();
    }
}
