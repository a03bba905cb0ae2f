// NATS JetStream client for the image-edit request and response queues

use crate::config::NatsConfig;
use crate::errors::QueueError;
use async_nats::jetstream::{
    consumer::{pull::Config as PullConfig, AckPolicy, PullConsumer},
    stream::{Config as StreamConfig, RetentionPolicy, Stream},
    Context as JetStreamContext,
};
use async_nats::{ConnectOptions, HeaderMap};
use std::time::Duration;
use tracing::{info, instrument};

/// Replies on the default response subject are kept this long
const RESPONSE_MAX_AGE: Duration = Duration::from_secs(86_400);

/// NATS JetStream client
pub struct NatsClient {
    client: async_nats::Client,
    jetstream: JetStreamContext,
    config: NatsConfig,
}

impl NatsClient {
    /// Create a NatsClient from an existing async_nats::Client
    pub fn from_client(client: async_nats::Client, config: NatsConfig) -> Self {
        let jetstream = async_nats::jetstream::new(client.clone());
        Self {
            client,
            jetstream,
            config,
        }
    }

    /// Create a new NATS client and connect to the server
    #[instrument(skip(config), fields(url = %config.url))]
    pub async fn new(config: NatsConfig) -> Result<Self, QueueError> {
        info!("Connecting to NATS server");

        let mut options = ConnectOptions::new().name("image-edit-worker");
        if let (Some(user), Some(password)) = (&config.username, &config.password) {
            options = options.user_and_password(user.clone(), password.clone());
        }

        let client = options
            .connect(config.url.as_str())
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to connect to NATS: {}", e)))?;

        info!("Connected to NATS server successfully");

        Ok(Self::from_client(client, config))
    }

    /// Declare the durable request and response streams
    #[instrument(skip(self))]
    pub async fn initialize_streams(&self) -> Result<(Stream, Stream), QueueError> {
        info!(
            request_stream = %self.config.request_stream,
            response_stream = %self.config.response_stream,
            "Initializing JetStream streams"
        );

        let request = self
            .get_or_create_stream(StreamConfig {
                name: self.config.request_stream.clone(),
                subjects: vec![self.config.request_subject.clone()],
                // Messages deleted after acknowledgment
                retention: RetentionPolicy::WorkQueue,
                ..Default::default()
            })
            .await?;

        let response = self
            .get_or_create_stream(StreamConfig {
                name: self.config.response_stream.clone(),
                subjects: vec![self.config.response_subject.clone()],
                retention: RetentionPolicy::Limits,
                max_age: RESPONSE_MAX_AGE,
                ..Default::default()
            })
            .await?;

        info!("Streams initialized successfully");

        Ok((request, response))
    }

    async fn get_or_create_stream(&self, config: StreamConfig) -> Result<Stream, QueueError> {
        let name = config.name.clone();
        self.jetstream
            .get_or_create_stream(config)
            .await
            .map_err(|e| {
                QueueError::StreamCreation(format!("Failed to create stream {}: {}", name, e))
            })
    }

    /// Create or get the durable request consumer.
    ///
    /// `max_ack_pending = 1` keeps at most one unacknowledged request per
    /// consumer, so the broker never hands this worker a second job while the
    /// first is still in flight.
    #[instrument(skip(self))]
    pub async fn get_or_create_consumer(&self) -> Result<PullConsumer, QueueError> {
        info!(
            consumer_name = %self.config.consumer_name,
            "Creating consumer"
        );

        let stream = self
            .jetstream
            .get_stream(&self.config.request_stream)
            .await
            .map_err(|e| QueueError::StreamNotFound(format!("Stream not found: {}", e)))?;

        let consumer_config = PullConfig {
            durable_name: Some(self.config.consumer_name.clone()),
            filter_subject: self.config.request_subject.clone(),
            ack_policy: AckPolicy::Explicit,
            ack_wait: Duration::from_secs(self.config.ack_wait_seconds),
            max_ack_pending: 1,
            ..Default::default()
        };

        let consumer = stream
            .get_or_create_consumer(&self.config.consumer_name, consumer_config)
            .await
            .map_err(|e| {
                QueueError::ConsumerCreation(format!("Failed to create consumer: {}", e))
            })?;

        info!(
            consumer_name = %self.config.consumer_name,
            "Consumer created successfully"
        );

        Ok(consumer)
    }

    /// Get the JetStream context for publishing/consuming
    pub fn jetstream(&self) -> &JetStreamContext {
        &self.jetstream
    }

    /// Get the NATS client
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    /// Get the configuration
    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Health check - verify the request stream is reachable
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), QueueError> {
        self.jetstream
            .get_stream(&self.config.request_stream)
            .await
            .map_err(|e| QueueError::HealthCheck(format!("Health check failed: {}", e)))?;

        Ok(())
    }
}

/// Read a header as an owned string
pub(crate) fn header_value(headers: Option<&HeaderMap>, name: &str) -> Option<String> {
    headers
        .and_then(|h| h.get(name))
        .map(|v| v.as_str().to_string())
}
