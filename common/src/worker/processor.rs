// Job processor - runs fetch → transform → store for one request

use crate::config::WorkerConfig;
use crate::errors::JobError;
use crate::models::{JobRequest, JobResult};
use crate::queue::JobHandler;
use crate::storage::BlobStore;
use crate::transform::ImageTransformer;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Derive the output key for a source key; independent of prompt and caller
pub fn output_key(prefix: &str, blob_key: &str) -> String {
    format!("{}{}", prefix, blob_key)
}

/// Job processor turns one request into exactly one result
pub struct JobProcessor {
    blob_store: Arc<dyn BlobStore>,
    transformer: Arc<dyn ImageTransformer>,
    output_prefix: String,
    output_content_type: String,
}

impl JobProcessor {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        transformer: Arc<dyn ImageTransformer>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            blob_store,
            transformer,
            output_prefix: config.output_prefix.clone(),
            output_content_type: config.output_content_type.clone(),
        }
    }

    /// Process a single request.
    ///
    /// Never fails: every error, including a panic inside an adapter, comes
    /// back as a failure result carrying the request's correlation id.
    #[instrument(skip_all, fields(
        correlation_id = %request.correlation_id,
        blob_key = %request.blob_key
    ))]
    pub async fn process(&self, request: &JobRequest) -> JobResult {
        let outcome = AssertUnwindSafe(self.run_pipeline(request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(JobError::Unknown(panic_message(panic))));

        match outcome {
            Ok(output_key) => {
                info!(output_key = %output_key, "Job completed successfully");
                JobResult::success(request.correlation_id.clone(), output_key)
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Job failed");
                JobResult::from_error(request.correlation_id.clone(), &e)
            }
        }
    }

    async fn run_pipeline(&self, request: &JobRequest) -> Result<String, JobError> {
        let source = self
            .blob_store
            .get(&request.blob_key)
            .await
            .map_err(JobError::Fetch)?;

        info!(size = source.len(), "Fetched source image");

        let edited = self
            .transformer
            .transform(&source, &request.prompt)
            .await?;

        let output_key = output_key(&self.output_prefix, &request.blob_key);

        self.blob_store
            .put(&output_key, &edited, &self.output_content_type)
            .await
            .map_err(JobError::Store)?;

        Ok(output_key)
    }

    /// Wrap this processor as the consumer's job handler
    pub fn into_handler(self: Arc<Self>) -> JobHandler {
        Arc::new(move |request: JobRequest| {
            let processor = Arc::clone(&self);
            async move { processor.process(&request).await }.boxed()
        })
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("unexpected failure: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("unexpected failure: {}", s)
    } else {
        "unexpected failure".to_string()
    }
}
