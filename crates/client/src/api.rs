//! HTTP implementations of [`JobTransport`].
//!
//! - [`PredictionApi`]: immediate creation then poll, using REST resource
//!   paths (`POST {base}/predictions`, `GET {base}/predictions/{id}`).
//! - [`TaskApi`]: submit with asynchronous delivery then poll, where both
//!   calls `POST` the same endpoint with a `task_type` discriminator.
//!
//! Both share the same contract from the caller's point of view.

use std::sync::Arc;

use async_trait::async_trait;
use genflow_core::{GenerationError, Job};
use serde_json::{json, Value};

use crate::config::{ApiVariant, ClientConfig};
use crate::http::HttpContext;
use crate::poll::PollConfig;
use crate::transport::{JobTransport, SubmitReceipt, SubmitRequest};
use crate::wire;

/// `task_type` value for submissions on the task endpoint.
pub const TASK_TYPE_SUBMIT: &str = "submit";
/// `task_type` value for status queries on the task endpoint.
pub const TASK_TYPE_QUERY: &str = "query";

/// Build the transport for the configured variant.
pub fn transport_from_config(
    config: &ClientConfig,
    ctx: Arc<HttpContext>,
) -> Arc<dyn JobTransport> {
    match config.variant {
        ApiVariant::Prediction => Arc::new(PredictionApi::new(ctx, config.endpoint.clone())),
        ApiVariant::Task => Arc::new(TaskApi::new(ctx, config.endpoint.clone())),
    }
}

// ---------------------------------------------------------------------------
// PredictionApi
// ---------------------------------------------------------------------------

/// REST-style prediction service.
pub struct PredictionApi {
    ctx: Arc<HttpContext>,
    base_url: String,
}

impl PredictionApi {
    /// * `base_url` - e.g. `https://proxy.example/v1`, without trailing slash.
    pub fn new(ctx: Arc<HttpContext>, base_url: impl Into<String>) -> Self {
        Self {
            ctx,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/predictions/{job_id}`, with the id as one escaped segment.
    fn status_url(&self, job_id: &str) -> Result<reqwest::Url, GenerationError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            GenerationError::PollingNetwork(format!("Invalid base URL '{}': {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                GenerationError::PollingNetwork(format!(
                    "Base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("predictions")
            .push(job_id);
        Ok(url)
    }
}

#[async_trait]
impl JobTransport for PredictionApi {
    fn name(&self) -> &str {
        "prediction"
    }

    fn default_poll_config(&self) -> PollConfig {
        ApiVariant::Prediction.default_poll_config()
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitReceipt, GenerationError> {
        let client = self.ctx.client().await?;
        let response = client
            .post(format!("{}/predictions", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::Submission {
                status: None,
                message: e.to_string(),
            })?;

        let body = submission_body(response).await?;
        let receipt = receipt_from_body(&body)?;

        tracing::info!(
            transport = self.name(),
            model = %request.model,
            job_id = %receipt.job_id,
            "Job submitted",
        );
        Ok(receipt)
    }

    async fn fetch_status(&self, job_id: &str) -> Result<Job, GenerationError> {
        let url = self.status_url(job_id)?;
        let client = self.ctx.client().await?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| GenerationError::PollingNetwork(e.to_string()))?;

        let body = status_body(response).await?;
        job_from_status_body(&body, job_id)
    }
}

// ---------------------------------------------------------------------------
// TaskApi
// ---------------------------------------------------------------------------

/// Single-endpoint task service with asynchronous delivery.
pub struct TaskApi {
    ctx: Arc<HttpContext>,
    endpoint: String,
}

impl TaskApi {
    pub fn new(ctx: Arc<HttpContext>, endpoint: impl Into<String>) -> Self {
        Self {
            ctx,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl JobTransport for TaskApi {
    fn name(&self) -> &str {
        "task"
    }

    fn default_poll_config(&self) -> PollConfig {
        ApiVariant::Task.default_poll_config()
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitReceipt, GenerationError> {
        let mut payload = json!({
            "task_type": TASK_TYPE_SUBMIT,
            "model": request.model,
            "input": request.input,
        });
        if let Some(version) = &request.version {
            payload["version"] = json!(version);
        }

        let client = self.ctx.client().await?;
        let response = client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::Submission {
                status: None,
                message: e.to_string(),
            })?;

        let body = submission_body(response).await?;
        let receipt = receipt_from_body(&body)?;

        tracing::info!(
            transport = self.name(),
            model = %request.model,
            job_id = %receipt.job_id,
            "Task submitted",
        );
        Ok(receipt)
    }

    async fn fetch_status(&self, job_id: &str) -> Result<Job, GenerationError> {
        let payload = json!({
            "task_type": TASK_TYPE_QUERY,
            "task_id": job_id,
        });

        let client = self.ctx.client().await?;
        let response = client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::PollingNetwork(e.to_string()))?;

        let body = status_body(response).await?;
        job_from_status_body(&body, job_id)
    }
}

// ---- private helpers ----

/// Return the response unchanged on a 2xx status, otherwise the status and
/// body text.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, (u16, String)> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err((status.as_u16(), body));
    }
    Ok(response)
}

async fn submission_body(response: reqwest::Response) -> Result<Value, GenerationError> {
    let response = ensure_success(response)
        .await
        .map_err(|(status, body)| GenerationError::Submission {
            status: Some(status),
            message: body,
        })?;
    response.json::<Value>().await.map_err(|e| GenerationError::Submission {
        status: None,
        message: format!("Invalid submission response: {e}"),
    })
}

async fn status_body(response: reqwest::Response) -> Result<Value, GenerationError> {
    let response = ensure_success(response)
        .await
        .map_err(|(status, body)| {
            GenerationError::PollingNetwork(format!("Status request returned {status}: {body}"))
        })?;
    response
        .json::<Value>()
        .await
        .map_err(|e| GenerationError::PollingNetwork(format!("Invalid status response: {e}")))
}

fn receipt_from_body(body: &Value) -> Result<SubmitReceipt, GenerationError> {
    let inner = wire::unwrap_envelope(body);
    let Some(job_id) = wire::job_id(inner) else {
        return Err(match wire::error_messages(inner).or_else(|| wire::error_messages(body)) {
            Some(message) => GenerationError::Submission {
                status: None,
                message,
            },
            None => GenerationError::MissingJobId,
        });
    };

    Ok(SubmitReceipt {
        job: wire::job_from_body(inner, &job_id),
        job_id,
    })
}

fn job_from_status_body(body: &Value, job_id: &str) -> Result<Job, GenerationError> {
    let inner = wire::unwrap_envelope(body);
    wire::job_from_body(inner, job_id).ok_or_else(|| {
        GenerationError::PollingNetwork(format!("Status response for {job_id} has no status field"))
    })
}
