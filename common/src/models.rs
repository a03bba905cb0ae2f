// Request and reply envelopes exchanged over the image-edit queues

use crate::errors::{ErrorKind, JobError, ValidationError};
use serde::{Deserialize, Serialize};

/// Header carrying the caller's correlation token
pub const CORRELATION_ID_HEADER: &str = "Correlation-Id";

/// Header naming the subject the reply should be sent to
pub const REPLY_TO_HEADER: &str = "Reply-To";

/// Transport-level metadata attached to an inbound message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMeta {
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
}

/// Raw request body as sent by callers.
///
/// Older callers name the blob key `imageKey`, `s3Key` or `s3_key`. All of
/// them are accepted; see [`RequestEnvelope::blob_key`] for precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "blobKey", default, skip_serializing_if = "Option::is_none")]
    pub blob_key: Option<String>,
    #[serde(rename = "imageKey", default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    #[serde(rename = "s3Key", default, skip_serializing_if = "Option::is_none")]
    pub s3_key_camel: Option<String>,
    #[serde(rename = "s3_key", default, skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Legacy callers send this as a number; see [`resolve_correlation_id`]
    #[serde(rename = "correlationId", default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<serde_json::Value>,
}

impl RequestEnvelope {
    /// First non-empty blob key, checked as `blobKey`, `imageKey`, `s3Key`, `s3_key`
    pub fn blob_key(&self) -> Option<&str> {
        [
            &self.blob_key,
            &self.image_key,
            &self.s3_key_camel,
            &self.s3_key,
        ]
        .into_iter()
        .filter_map(|k| k.as_deref())
        .find(|k| !k.is_empty())
    }
}

/// A validated job request. Lives for one processing cycle only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub correlation_id: String,
    pub reply_to: String,
    pub blob_key: String,
    pub prompt: String,
}

impl JobRequest {
    /// Parse and validate a request body.
    ///
    /// `correlation_id` and `reply_to` are already resolved from the
    /// transport, so a validation failure can still be replied to.
    pub fn parse(
        correlation_id: String,
        reply_to: String,
        payload: &[u8],
    ) -> Result<Self, ValidationError> {
        let envelope: RequestEnvelope = serde_json::from_slice(payload)
            .map_err(|e| ValidationError::InvalidJson(e.to_string()))?;

        let blob_key = envelope
            .blob_key()
            .ok_or_else(|| ValidationError::MissingField("blobKey".to_string()))?
            .to_string();

        let prompt = envelope
            .prompt
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ValidationError::MissingField("prompt".to_string()))?;

        Ok(Self {
            correlation_id,
            reply_to,
            blob_key,
            prompt,
        })
    }
}

/// Resolve the correlation token for a message.
///
/// The transport header wins. Legacy callers only put it in the body, so the
/// body is searched leniently; a body that is not JSON yields an empty token.
pub fn resolve_correlation_id(meta: &TransportMeta, payload: &[u8]) -> String {
    if let Some(id) = &meta.correlation_id {
        return id.clone();
    }

    serde_json::from_slice::<serde_json::Value>(payload)
        .ok()
        .and_then(|v| match v.get("correlationId") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_default()
}

/// Outcome of one job, serialized as the reply body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    Success {
        success: SuccessFlag<true>,
        #[serde(rename = "correlationId")]
        correlation_id: String,
        #[serde(rename = "outputKey")]
        output_key: String,
    },
    Failure {
        success: SuccessFlag<false>,
        #[serde(rename = "correlationId")]
        correlation_id: String,
        error: String,
        #[serde(rename = "errorKind")]
        kind: ErrorKind,
    },
}

impl JobResult {
    pub fn success(correlation_id: impl Into<String>, output_key: impl Into<String>) -> Self {
        JobResult::Success {
            success: SuccessFlag,
            correlation_id: correlation_id.into(),
            output_key: output_key.into(),
        }
    }

    pub fn failure(
        correlation_id: impl Into<String>,
        kind: ErrorKind,
        error: impl Into<String>,
    ) -> Self {
        JobResult::Failure {
            success: SuccessFlag,
            correlation_id: correlation_id.into(),
            error: error.into(),
            kind,
        }
    }

    pub fn from_error(correlation_id: impl Into<String>, error: &JobError) -> Self {
        Self::failure(correlation_id, error.kind(), error.to_string())
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            JobResult::Success { correlation_id, .. } | JobResult::Failure { correlation_id, .. } => {
                correlation_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            JobResult::Success { .. } => None,
            JobResult::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Metric label for this outcome
    pub fn outcome(&self) -> &'static str {
        match self {
            JobResult::Success { .. } => "success",
            JobResult::Failure { kind, .. } => kind.as_str(),
        }
    }
}

/// The literal `success` field, fixed per variant so the untagged union
/// round-trips unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuccessFlag<const V: bool>;

impl<const V: bool> Serialize for SuccessFlag<V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(V)
    }
}

impl<'de, const V: bool> Deserialize<'de> for SuccessFlag<V> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = bool::deserialize(deserializer)?;
        if value == V {
            Ok(SuccessFlag)
        } else {
            Err(serde::de::Error::custom(format!("expected success = {}", V)))
        }
    }
}
