//! Transport seam between the job client and a concrete remote protocol.

use async_trait::async_trait;
use genflow_core::{GenerationError, Job};
use serde::Serialize;

use crate::poll::PollConfig;

/// The `(model, version, input)` triple submitted to the remote service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub input: serde_json::Value,
}

impl SubmitRequest {
    pub fn new(
        model: impl Into<String>,
        version: Option<String>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            model: model.into(),
            version,
            input,
        }
    }
}

/// What the remote service answered to a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    pub job_id: String,
    /// Job state, when the submission response already carried a status.
    pub job: Option<Job>,
}

impl SubmitReceipt {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            job: None,
        }
    }

    /// The job, if the service resolved it synchronously.
    pub fn terminal_job(&self) -> Option<&Job> {
        self.job.as_ref().filter(|job| job.status.is_terminal())
    }
}

/// One remote submission protocol.
///
/// Implementations issue exactly one HTTP request per call and never
/// retry; retries belong to the caller's transformation pipeline.
#[async_trait]
pub trait JobTransport: Send + Sync {
    /// Short protocol name for logs.
    fn name(&self) -> &str;

    /// Polling parameters used when the configuration sets none.
    fn default_poll_config(&self) -> PollConfig;

    /// Create or enqueue a job.
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitReceipt, GenerationError>;

    /// Fetch the current state of a job.
    async fn fetch_status(&self, job_id: &str) -> Result<Job, GenerationError>;
}
