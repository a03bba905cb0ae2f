// Request consumer: parse, process, reply, ack, one message at a time

use crate::errors::{JobError, QueueError};
use crate::models::{
    resolve_correlation_id, JobRequest, JobResult, TransportMeta, CORRELATION_ID_HEADER,
    REPLY_TO_HEADER,
};
use crate::queue::nats::header_value;
use crate::queue::publisher::ReplyPublisher;
use crate::telemetry;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{error, field, info, instrument, warn, Span};

/// Callback that runs the pipeline for one validated request
pub type JobHandler =
    Arc<dyn Fn(JobRequest) -> futures::future::BoxFuture<'static, JobResult> + Send + Sync>;

/// An inbound message as seen by the consumer
#[async_trait]
pub trait Delivery: Send + Sync {
    fn payload(&self) -> &[u8];

    fn transport_meta(&self) -> TransportMeta;

    async fn ack(&self) -> Result<(), QueueError>;
}

#[async_trait]
impl Delivery for async_nats::jetstream::Message {
    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    fn transport_meta(&self) -> TransportMeta {
        let headers = self.message.headers.as_ref();
        TransportMeta {
            correlation_id: header_value(headers, CORRELATION_ID_HEADER),
            reply_to: header_value(headers, REPLY_TO_HEADER),
        }
    }

    async fn ack(&self) -> Result<(), QueueError> {
        async_nats::jetstream::Message::ack(self)
            .await
            .map_err(|e| QueueError::AckFailed(format!("Failed to acknowledge message: {}", e)))
    }
}

/// Sequential consumer for image-edit requests.
///
/// Every delivery gets exactly one reply attempt followed by exactly one ack,
/// whatever the outcome. Failures are reported to the caller through the
/// reply, never through broker redelivery.
pub struct EditRequestConsumer {
    handler: JobHandler,
    publisher: Arc<dyn ReplyPublisher>,
    default_reply_to: String,
    shutdown_flag: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl EditRequestConsumer {
    pub fn new(
        handler: JobHandler,
        publisher: Arc<dyn ReplyPublisher>,
        default_reply_to: impl Into<String>,
    ) -> Self {
        Self {
            handler,
            publisher,
            default_reply_to: default_reply_to.into(),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    /// Handle one delivery end to end and return the result that was replied
    #[instrument(skip_all, fields(correlation_id = field::Empty, reply_to = field::Empty))]
    pub async fn handle<D: Delivery>(&self, delivery: &D) -> JobResult {
        let started = Instant::now();
        let meta = delivery.transport_meta();
        let payload = delivery.payload();

        let correlation_id = resolve_correlation_id(&meta, payload);
        let reply_to = meta
            .reply_to
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.default_reply_to.clone());

        let span = Span::current();
        span.record("correlation_id", correlation_id.as_str());
        span.record("reply_to", reply_to.as_str());

        let result = match JobRequest::parse(correlation_id.clone(), reply_to.clone(), payload) {
            Ok(request) => {
                info!(blob_key = %request.blob_key, "Processing image edit request");
                (self.handler)(request).await
            }
            Err(e) => {
                warn!(error = %e, "Rejected invalid request");
                JobResult::from_error(correlation_id, &JobError::from(e))
            }
        };

        if let Err(e) = self.publisher.publish(&reply_to, &result).await {
            let err = JobError::Publish(e);
            error!(
                error = %err,
                kind = %err.kind(),
                "Failed to publish reply, caller will not be notified"
            );
            telemetry::record_reply_publish_failed();
        }

        if let Err(e) = delivery.ack().await {
            error!(error = %e, "Failed to acknowledge message");
        }

        telemetry::record_job_completed(result.outcome(), started.elapsed());
        info!(
            outcome = result.outcome(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request handled"
        );

        result
    }

    /// Consume `messages` strictly in order until shutdown.
    ///
    /// The next message is not pulled until the current one has been
    /// replied to and acknowledged. A stream that ends is a fatal broker
    /// error.
    pub async fn run<S, D, E>(&self, mut messages: S) -> Result<(), QueueError>
    where
        S: Stream<Item = Result<D, E>> + Unpin + Send,
        D: Delivery,
        E: Display,
    {
        info!("[*] Waiting for messages. To exit press CTRL+C");

        loop {
            if self.shutdown_flag.load(Ordering::Relaxed) {
                info!("Shutdown requested, stopping consumer");
                break;
            }

            let next = tokio::select! {
                next = messages.next() => next,
                _ = self.shutdown_notify.notified() => {
                    info!("Shutdown notification received");
                    break;
                }
            };

            match next {
                Some(Ok(delivery)) => {
                    self.handle(&delivery).await;
                }
                Some(Err(e)) => {
                    error!(error = %e, "Error receiving message");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                None => {
                    error!("[!] Message stream ended unexpectedly");
                    return Err(QueueError::Connection(
                        "message stream closed by broker".to_string(),
                    ));
                }
            }
        }

        info!("Consumer stopped gracefully");
        Ok(())
    }

    /// Request graceful shutdown; the in-flight message, if any, completes first
    pub fn shutdown(&self) {
        info!("Requesting consumer shutdown");
        self.shutdown_flag.store(true, Ordering::Relaxed);
        self.shutdown_notify.notify_one();
    }
}
