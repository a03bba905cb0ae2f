// Image edit worker binary entry point

use anyhow::Result;
use common::config::Settings;
use common::queue::NatsClient;
use common::storage::{BlobStore, MinioBlobStore, MinioClient};
use common::telemetry;
use common::transform::{ImageTransformer, OpenAiImageEditor};
use common::worker::EditWorker;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    telemetry::init_logging(
        &settings.observability.log_level,
        settings.observability.tracing_endpoint.as_deref(),
    )?;

    info!("Starting image edit worker");

    if let Some(port) = settings.observability.metrics_port {
        telemetry::init_metrics(port)?;
    }

    // Broker connection failure at startup is fatal; there is no reconnect loop
    let nats_client = NatsClient::new(settings.nats.clone()).await.map_err(|e| {
        error!(error = %e, "[!] Failed to connect to NATS");
        anyhow::anyhow!("NATS initialization error: {}", e)
    })?;

    let minio_client = MinioClient::new(&settings.minio).await.map_err(|e| {
        error!(error = %e, "Failed to initialize MinIO client");
        anyhow::anyhow!("MinIO initialization error: {}", e)
    })?;

    if let Err(e) = minio_client.health_check().await {
        warn!(error = %e, "MinIO is not reachable yet, jobs will fail with FetchError until it is");
    }

    let blob_store: Arc<dyn BlobStore> = Arc::new(MinioBlobStore::new(minio_client));
    let transformer: Arc<dyn ImageTransformer> =
        Arc::new(OpenAiImageEditor::new(&settings.transform).map_err(|e| {
            error!(error = %e, "Failed to initialize image edit provider");
            anyhow::anyhow!("Transform initialization error: {}", e)
        })?);

    let worker = Arc::new(
        EditWorker::new(nats_client, blob_store, transformer, &settings.worker)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create worker");
                anyhow::anyhow!("Worker creation error: {}", e)
            })?,
    );

    let mut worker_handle = {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move { worker.start().await })
    };

    tokio::select! {
        outcome = &mut worker_handle => {
            // The consume loop only returns on its own after a fatal broker error
            return match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!(error = %e, "[!] Worker stopped on broker error");
                    Err(anyhow::anyhow!("Worker error: {}", e))
                }
                Err(e) => Err(anyhow::anyhow!("Worker task failed: {}", e)),
            };
        }
        signal = signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("[*] Stopping service"),
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
        }
    }

    worker.shutdown();

    info!("Waiting for the in-flight job to complete");
    match worker_handle.await {
        Ok(Err(e)) => warn!(error = %e, "Worker reported an error during shutdown"),
        Err(e) => warn!(error = %e, "Worker task failed during shutdown"),
        Ok(Ok(())) => {}
    }

    info!("Worker shutdown complete");
    Ok(())
}
