// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub nats: NatsConfig,
    pub minio: MinioConfig,
    pub transform: TransformConfig,
    pub worker: WorkerConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL (e.g., "nats://localhost:4222")
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Durable stream holding edit requests
    pub request_stream: String,
    pub request_subject: String,
    /// Durable stream capturing replies sent to the default reply subject
    pub response_stream: String,
    pub response_subject: String,
    /// Durable consumer shared by all worker processes
    pub consumer_name: String,
    /// Seconds the broker waits for an ack before redelivering
    pub ack_wait_seconds: u64,
    /// Seconds the request client waits for a reply
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_seconds: u64,
}

fn default_reply_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinioConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    pub api_key: String,
    /// Provider API root, e.g. "https://api.openai.com/v1"
    pub base_url: String,
    #[serde(default)]
    pub model: Option<String>,
    pub size: String,
    /// No timeout when unset
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Namespace prepended to the source key to form the output key
    pub output_prefix: String,
    pub output_content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    #[serde(default)]
    pub metrics_port: Option<u16>,
    #[serde(default)]
    pub tracing_endpoint: Option<String>,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let defaults = Config::try_from(&Settings::default())?;

        let builder = Config::builder()
            .add_source(defaults)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.nats.url.is_empty() {
            return Err("NATS URL cannot be empty".to_string());
        }
        if self.nats.request_stream.is_empty() || self.nats.request_subject.is_empty() {
            return Err("NATS request stream and subject cannot be empty".to_string());
        }
        if self.nats.response_stream.is_empty() || self.nats.response_subject.is_empty() {
            return Err("NATS response stream and subject cannot be empty".to_string());
        }
        if self.nats.request_subject == self.nats.response_subject {
            return Err("NATS request and response subjects must differ".to_string());
        }
        if self.nats.consumer_name.is_empty() {
            return Err("NATS consumer_name cannot be empty".to_string());
        }
        if self.nats.ack_wait_seconds == 0 {
            return Err("NATS ack_wait_seconds must be greater than 0".to_string());
        }

        if self.minio.endpoint.is_empty() {
            return Err("MinIO endpoint cannot be empty".to_string());
        }
        if self.minio.bucket.is_empty() {
            return Err("MinIO bucket cannot be empty".to_string());
        }

        if self.transform.api_key.is_empty() {
            return Err("Transform api_key cannot be empty".to_string());
        }
        if self.transform.base_url.is_empty() {
            return Err("Transform base_url cannot be empty".to_string());
        }

        if self.worker.output_prefix.is_empty() {
            return Err("Worker output_prefix cannot be empty".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                username: None,
                password: None,
                request_stream: "IMAGE_EDIT_REQUEST".to_string(),
                request_subject: "image_edit_request".to_string(),
                response_stream: "IMAGE_EDIT_RESPONSE".to_string(),
                response_subject: "image_edit_response".to_string(),
                consumer_name: "image-edit-workers".to_string(),
                ack_wait_seconds: 600,
                reply_timeout_seconds: default_reply_timeout(),
            },
            minio: MinioConfig {
                endpoint: "http://localhost:9000".to_string(),
                access_key: "minioadmin".to_string(),
                secret_key: "minioadmin".to_string(),
                bucket: "photo-groups".to_string(),
                region: "us-east-1".to_string(),
            },
            transform: TransformConfig {
                api_key: "change-me".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: None,
                size: "1024x1024".to_string(),
                timeout_seconds: None,
            },
            worker: WorkerConfig {
                output_prefix: "edited/".to_string(),
                output_content_type: "image/png".to_string(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: None,
                tracing_endpoint: None,
            },
        }
    }
}
