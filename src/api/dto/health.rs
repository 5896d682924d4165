//! DTOs for health check endpoint.

use serde::{Deserialize, Serialize};

use crate::application::pipeline::PipelineSnapshot;

/// Health check response.
///
/// `status` is `healthy` or `degraded`, decided by the real-time store only.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
    pub pipeline: PipelineSnapshot,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub realtime_store: CheckStatus,
    pub ingest: CheckStatus,
}

/// Individual component health status.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckStatus {
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
