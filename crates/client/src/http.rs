//! Shared HTTP context.
//!
//! [`HttpContext`] holds the one [`reqwest::Client`] used by the job APIs
//! and the upload client. The client is built lazily on first use; the
//! once-cell makes concurrent first callers wait for a single build instead
//! of racing to create their own.

use std::time::Duration;

use genflow_core::GenerationError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::OnceCell;

use crate::config::ClientConfig;

pub struct HttpContext {
    client: OnceCell<reqwest::Client>,
    extra_headers: Vec<(String, String)>,
    request_timeout: Duration,
}

impl HttpContext {
    pub fn new(extra_headers: Vec<(String, String)>, request_timeout: Duration) -> Self {
        Self {
            client: OnceCell::new(),
            extra_headers,
            request_timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.extra_headers.clone(), config.request_timeout)
    }

    /// The shared client, built on first call.
    pub async fn client(&self) -> Result<&reqwest::Client, GenerationError> {
        self.client
            .get_or_try_init(|| async { self.build_client() })
            .await
    }

    fn build_client(&self) -> Result<reqwest::Client, GenerationError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                GenerationError::Config(format!("Invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                GenerationError::Config(format!("Invalid value for header '{name}': {e}"))
            })?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| GenerationError::Config(format!("Failed to build HTTP client: {e}")))?;

        tracing::debug!(
            extra_headers = self.extra_headers.len(),
            timeout_secs = self.request_timeout.as_secs(),
            "HTTP client initialised",
        );

        Ok(client)
    }
}

impl std::fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Header values may carry proxy credentials; only names are shown.
        let names: Vec<&str> = self.extra_headers.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("HttpContext")
            .field("initialised", &self.client.initialized())
            .field("extra_headers", &names)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
