use std::sync::Arc;

use genflow_core::{GenerationError, Job};
use tokio_util::sync::CancellationToken;

use crate::api::transport_from_config;
use crate::config::ClientConfig;
use crate::http::HttpContext;
use crate::poll::{poll_until_terminal, PollConfig};
use crate::transport::{JobTransport, SubmitReceipt, SubmitRequest};

/// Submits generation requests and polls them to a terminal state.
///
/// Network errors are never retried here; a failed status request aborts
/// the whole run.
#[derive(Clone)]
pub struct JobClient {
    transport: Arc<dyn JobTransport>,
    poll: PollConfig,
}

impl JobClient {
    /// Client using the transport's default polling parameters.
    pub fn new(transport: Arc<dyn JobTransport>) -> Self {
        let poll = transport.default_poll_config();
        Self { transport, poll }
    }

    /// Client for the configured variant, sharing `ctx` for HTTP.
    pub fn from_config(config: &ClientConfig, ctx: Arc<HttpContext>) -> Self {
        Self {
            transport: transport_from_config(config, ctx),
            poll: config.poll_config(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Create or enqueue the job. One HTTP request.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitReceipt, GenerationError> {
        self.transport.submit(request).await
    }

    /// Poll an already submitted job to a terminal state.
    pub async fn poll(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Job, GenerationError> {
        poll_until_terminal(self.transport.as_ref(), job_id, &self.poll, cancel).await
    }

    /// Submit and poll.
    ///
    /// If the submission response already reports a terminal status, the
    /// job resolves from it without polling.
    pub async fn run(
        &self,
        request: &SubmitRequest,
        cancel: &CancellationToken,
    ) -> Result<Job, GenerationError> {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let receipt = self.submit(request).await?;

        if let Some(job) = receipt.terminal_job() {
            tracing::info!(
                transport = self.transport.name(),
                job_id = %job.id,
                status = %job.status,
                "Job resolved at submission",
            );
            return job.clone().into_terminal_result();
        }

        self.poll(&receipt.job_id, cancel).await
    }
}

impl std::fmt::Debug for JobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobClient")
            .field("transport", &self.transport.name())
            .field("poll", &self.poll)
            .finish()
    }
}
