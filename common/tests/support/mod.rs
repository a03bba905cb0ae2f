// In-memory collaborators for worker tests

#![allow(dead_code)]

use async_trait::async_trait;
use common::config::WorkerConfig;
use common::errors::{QueueError, StorageError, TransformError};
use common::models::{JobResult, TransportMeta};
use common::queue::{Delivery, EditRequestConsumer, ReplyPublisher};
use common::storage::BlobStore;
use common::transform::ImageTransformer;
use common::worker::JobProcessor;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared event log plus a concurrency gauge across all fakes
#[derive(Default)]
pub struct Probe {
    events: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Probe {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    probe: Arc<Probe>,
    delay: Duration,
}

impl MemoryBlobStore {
    pub fn new(probe: Arc<Probe>) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            probe,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.to_vec(), "image/png".to_string()));
    }

    pub fn object(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.probe.enter();
        self.probe.record(format!("fetch:{}", key));
        tokio::time::sleep(self.delay).await;
        let found = self.objects.lock().unwrap().get(key).map(|(d, _)| d.clone());
        self.probe.exit();
        found.ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.probe.enter();
        self.probe.record(format!("store:{}", key));
        tokio::time::sleep(self.delay).await;
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.to_vec(), content_type.to_string()));
        self.probe.exit();
        Ok(())
    }
}

/// Reverses the input bytes, or fails with a fixed provider message
pub struct FakeTransformer {
    probe: Arc<Probe>,
    failure: Option<String>,
    delay: Duration,
}

impl FakeTransformer {
    pub fn succeeding(probe: Arc<Probe>) -> Self {
        Self {
            probe,
            failure: None,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(probe: Arc<Probe>, message: &str) -> Self {
        Self {
            probe,
            failure: Some(message.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ImageTransformer for FakeTransformer {
    async fn transform(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, TransformError> {
        self.probe.enter();
        self.probe.record(format!("transform:{}", prompt));
        tokio::time::sleep(self.delay).await;
        self.probe.exit();
        match &self.failure {
            Some(message) => Err(TransformError::Provider(message.clone())),
            None => Ok(image.iter().rev().copied().collect()),
        }
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<(String, JobResult)>>,
    probe: Option<Arc<Probe>>,
}

impl RecordingPublisher {
    pub fn with_probe(probe: Arc<Probe>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            probe: Some(probe),
        }
    }

    pub fn sent(&self) -> Vec<(String, JobResult)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyPublisher for RecordingPublisher {
    async fn publish(&self, reply_to: &str, result: &JobResult) -> Result<(), QueueError> {
        if let Some(probe) = &self.probe {
            probe.record(format!("reply:{}", result.correlation_id()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((reply_to.to_string(), result.clone()));
        Ok(())
    }
}

pub struct FakeDelivery {
    payload: Vec<u8>,
    meta: TransportMeta,
    acks: AtomicUsize,
    probe: Option<Arc<Probe>>,
}

impl FakeDelivery {
    pub fn new(payload: impl Into<Vec<u8>>, correlation_id: Option<&str>, reply_to: Option<&str>) -> Self {
        Self {
            payload: payload.into(),
            meta: TransportMeta {
                correlation_id: correlation_id.map(str::to_string),
                reply_to: reply_to.map(str::to_string),
            },
            acks: AtomicUsize::new(0),
            probe: None,
        }
    }

    pub fn json(body: serde_json::Value, correlation_id: &str, reply_to: &str) -> Self {
        Self::new(body.to_string(), Some(correlation_id), Some(reply_to))
    }

    pub fn with_probe(mut self, probe: Arc<Probe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn ack_count(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn transport_meta(&self) -> TransportMeta {
        self.meta.clone()
    }

    async fn ack(&self) -> Result<(), QueueError> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        if let Some(probe) = &self.probe {
            probe.record(format!(
                "ack:{}",
                self.meta.correlation_id.as_deref().unwrap_or_default()
            ));
        }
        Ok(())
    }
}

pub fn worker_config() -> WorkerConfig {
    WorkerConfig {
        output_prefix: "edited/".to_string(),
        output_content_type: "image/png".to_string(),
    }
}

/// Consumer over the given fakes, replying to "image_edit_response" by default
pub fn consumer(
    store: Arc<MemoryBlobStore>,
    transformer: Arc<FakeTransformer>,
    publisher: Arc<RecordingPublisher>,
) -> EditRequestConsumer {
    let processor = Arc::new(JobProcessor::new(store, transformer, &worker_config()));
    EditRequestConsumer::new(processor.into_handler(), publisher, "image_edit_response")
}
