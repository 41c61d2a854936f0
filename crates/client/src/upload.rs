//! Binary upload service client.
//!
//! Turns local bytes into a URL the inference service can fetch. The
//! upload endpoint takes a multipart form with one binary field named
//! [`UPLOAD_FIELD`] and answers `{ "url": "..." }`.

use std::sync::Arc;

use async_trait::async_trait;
use genflow_core::GenerationError;
use serde::Deserialize;

use crate::http::HttpContext;

/// Multipart field carrying the file bytes.
pub const UPLOAD_FIELD: &str = "file";

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `bytes` and return a remotely fetchable URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        file_name: &str,
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Multipart uploader for the configured upload endpoint.
pub struct HttpUploader {
    ctx: Arc<HttpContext>,
    upload_url: String,
}

impl HttpUploader {
    pub fn new(ctx: Arc<HttpContext>, upload_url: impl Into<String>) -> Self {
        Self {
            ctx,
            upload_url: upload_url.into(),
        }
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        file_name: &str,
    ) -> Result<String, GenerationError> {
        let size = bytes.len();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| {
                GenerationError::Staging(format!("Invalid MIME type '{mime_type}': {e}"))
            })?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let client = self.ctx.client().await?;
        let response = client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GenerationError::Staging(format!("Upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GenerationError::Staging(format!(
                "Upload failed ({}): {body}",
                status.as_u16()
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Staging(format!("Invalid upload response: {e}")))?;

        let url = parsed
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::Staging("Upload response did not contain a url".into())
            })?;

        tracing::debug!(file_name, mime_type, size, url = %url, "Uploaded local resource");
        Ok(url)
    }
}
