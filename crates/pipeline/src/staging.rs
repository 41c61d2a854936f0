//! Resource staging.
//!
//! Replaces local resource handles in a mapped request input with URLs the
//! remote service can fetch. Remote URLs and data URIs pass through
//! unchanged; `blob:` handles are read from a [`BlobSource`] and `asset:`
//! handles from the host engine, then uploaded.

use std::collections::HashMap;
use std::sync::Arc;

use genflow_client::Uploader;
use genflow_core::GenerationError;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::blob::{BlobSource, BLOB_PREFIX};
use crate::engine::HostEngine;

/// Prefix of engine-internal buffer handles.
pub const ASSET_PREFIX: &str = "asset:";

/// A string that refers to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef<'a> {
    /// Absolute `http(s)` URL.
    Remote(&'a str),
    /// Inline `data:` URI.
    DataUri(&'a str),
    /// In-memory ephemeral handle, the full `blob:` string.
    Blob(&'a str),
    /// Engine buffer id, without the `asset:` prefix.
    EngineBuffer(&'a str),
}

impl<'a> ResourceRef<'a> {
    /// Classify `s`. Strings that are not resource references yield `None`.
    ///
    /// Local handles are single tokens: a `blob:` or `asset:` string with
    /// whitespace or an empty id is text, not a handle.
    pub fn parse(s: &'a str) -> Option<Self> {
        let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(Self::Remote(s))
        } else if lower.starts_with("data:") {
            Some(Self::DataUri(s))
        } else if lower.starts_with(BLOB_PREFIX) {
            let id = local_id(s, BLOB_PREFIX)?;
            (!id.is_empty()).then_some(Self::Blob(s))
        } else if lower.starts_with(ASSET_PREFIX) {
            local_id(s, ASSET_PREFIX).map(Self::EngineBuffer)
        } else {
            None
        }
    }

    /// Whether the reference must be uploaded before submission.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Blob(_) | Self::EngineBuffer(_))
    }
}

fn local_id<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let id = s.get(prefix.len()..)?;
    (!id.is_empty() && !id.chars().any(char::is_whitespace)).then_some(id)
}

/// Uploads local resources and rewrites handles to URLs.
pub struct ResourceStager {
    uploader: Arc<dyn Uploader>,
    engine: Arc<dyn HostEngine>,
    blobs: Arc<dyn BlobSource>,
}

impl ResourceStager {
    pub fn new(
        uploader: Arc<dyn Uploader>,
        engine: Arc<dyn HostEngine>,
        blobs: Arc<dyn BlobSource>,
    ) -> Self {
        Self {
            uploader,
            engine,
            blobs,
        }
    }

    /// Stage a single handle and return a fetchable URL.
    pub async fn stage(&self, handle: &str) -> Result<String, GenerationError> {
        let (bytes, mime_type) = match ResourceRef::parse(handle) {
            Some(ResourceRef::Remote(url) | ResourceRef::DataUri(url)) => {
                return Ok(url.to_string())
            }
            Some(ResourceRef::Blob(blob)) => {
                let data = self.blobs.fetch(blob).await?;
                (data.bytes, data.mime_type)
            }
            Some(ResourceRef::EngineBuffer(id)) => {
                let bytes = self.engine.read_buffer(id).await.map_err(as_staging)?;
                let mime_type = self.engine.mime_type(id).await.map_err(as_staging)?;
                (bytes, mime_type)
            }
            None => {
                return Err(GenerationError::Staging(format!(
                    "Not a resource reference: {handle}"
                )))
            }
        };

        let file_name = format!("upload.{}", extension_for(&mime_type));
        let url = self.uploader.upload(bytes, &mime_type, &file_name).await?;
        tracing::debug!(handle, url = %url, "Staged local resource");
        Ok(url)
    }

    /// Stage every local handle found under the top-level `media_keys` of
    /// `input`. Other fields, the prompt included, are left alone.
    ///
    /// Each distinct handle is uploaded once, in document order. The token
    /// is checked before every upload.
    pub async fn stage_input<K: AsRef<str>>(
        &self,
        mut input: Value,
        media_keys: &[K],
        cancel: &CancellationToken,
    ) -> Result<Value, GenerationError> {
        let mut handles = Vec::new();
        for value in media_values(&input, media_keys) {
            collect_local_handles(value, &mut handles);
        }
        if handles.is_empty() {
            return Ok(input);
        }

        let mut staged = HashMap::with_capacity(handles.len());
        for handle in handles {
            if staged.contains_key(&handle) {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            let url = self.stage(&handle).await?;
            staged.insert(handle, url);
        }

        if let Value::Object(map) = &mut input {
            for key in media_keys {
                if let Some(value) = map.get_mut(key.as_ref()) {
                    replace_handles(value, &staged);
                }
            }
        }
        Ok(input)
    }
}

/// Whether any of the `media_keys` of `input` holds a handle that needs
/// uploading.
pub fn has_local_handles<K: AsRef<str>>(input: &Value, media_keys: &[K]) -> bool {
    let mut handles = Vec::new();
    for value in media_values(input, media_keys) {
        collect_local_handles(value, &mut handles);
    }
    !handles.is_empty()
}

fn media_values<'v, K: AsRef<str>>(
    input: &'v Value,
    media_keys: &'v [K],
) -> impl Iterator<Item = &'v Value> + 'v {
    media_keys
        .iter()
        .filter_map(move |key| input.as_object()?.get(key.as_ref()))
}

fn collect_local_handles(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if ResourceRef::parse(s).is_some_and(|r| r.is_local()) {
                out.push(s.clone());
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_local_handles(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_local_handles(v, out)),
        _ => {}
    }
}

fn replace_handles(value: &mut Value, staged: &HashMap<String, String>) {
    match value {
        Value::String(s) => {
            if let Some(url) = staged.get(s.as_str()) {
                *s = url.clone();
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| replace_handles(v, staged)),
        Value::Object(map) => map.values_mut().for_each(|v| replace_handles(v, staged)),
        _ => {}
    }
}

/// Host engine failures while reading a buffer are staging failures.
fn as_staging(err: GenerationError) -> GenerationError {
    match err {
        GenerationError::Host(message) => GenerationError::Staging(message),
        other => other,
    }
}

fn extension_for(mime_type: &str) -> &str {
    let subtype = mime_type
        .split(';')
        .next()
        .and_then(|m| m.split('/').nth(1))
        .map(str::trim)
        .unwrap_or("");
    match subtype {
        "jpeg" => "jpg",
        "svg+xml" => "svg",
        "quicktime" => "mov",
        "" => "bin",
        other => other,
    }
}
