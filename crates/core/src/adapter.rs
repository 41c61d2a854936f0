//! Per-model capability interface.
//!
//! Each remote model expects its own wire shape. A [`ModelAdapter`] maps the
//! generic [`GenerationRequest`] into that shape and reports the dimensions
//! the placeholder should have. The orchestrator depends only on this trait.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Dimensions, MediaKind};

/// Top-level input keys that may carry media handles needing staging.
pub const DEFAULT_MEDIA_INPUT_KEYS: &[&str] = &["image", "images", "mask"];

/// A model-agnostic generation request as built by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    /// Requested output size, if the caller has one.
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    /// Input media handles: remote URLs, data URIs, or local handles that
    /// must be staged before submission.
    #[serde(default)]
    pub image_inputs: Vec<String>,
    /// Free-form model parameters forwarded by adapters.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some(Dimensions::new(width, height));
        self
    }

    pub fn with_image_input(mut self, handle: impl Into<String>) -> Self {
        self.image_inputs.push(handle.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// Translates generic requests into a specific model's wire shape.
///
/// Implementations are pure: no I/O, no shared state.
pub trait ModelAdapter: Send + Sync {
    /// Model identifier sent with the submission.
    fn model(&self) -> &str;

    /// Version (or deployment id) sent with the submission.
    fn version(&self) -> Option<&str> {
        None
    }

    /// Kind of media this model produces.
    fn output_kind(&self) -> MediaKind {
        MediaKind::Image
    }

    /// Build the wire `input` object for a request.
    fn map_input(&self, request: &GenerationRequest) -> Value;

    /// Rewrite the raw success payload before normalization.
    fn map_output(&self, raw: Value) -> Value {
        raw
    }

    /// Keys of the mapped input whose values are media references. Only these
    /// are scanned for local handles; text fields such as the prompt never are.
    fn media_input_keys(&self) -> &[&str] {
        DEFAULT_MEDIA_INPUT_KEYS
    }

    /// Dimensions used to size the placeholder.
    fn estimate_dimensions(&self, request: &GenerationRequest) -> Dimensions {
        request.dimensions.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Generic adapter
// ---------------------------------------------------------------------------

/// Adapter for models accepting the common `prompt` / `width` / `height`
/// shape. Input images are sent as `image` (one) or `images` (several).
#[derive(Debug, Clone)]
pub struct GenericAdapter {
    model: String,
    version: Option<String>,
    output_kind: MediaKind,
}

impl GenericAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            version: None,
            output_kind: MediaKind::Image,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_output_kind(mut self, kind: MediaKind) -> Self {
        self.output_kind = kind;
        self
    }
}

impl ModelAdapter for GenericAdapter {
    fn model(&self) -> &str {
        &self.model
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn output_kind(&self) -> MediaKind {
        self.output_kind
    }

    fn map_input(&self, request: &GenerationRequest) -> Value {
        let mut input = request.params.clone();
        input.insert("prompt".into(), Value::String(request.prompt.clone()));

        if let Some(negative) = &request.negative_prompt {
            input.insert("negative_prompt".into(), Value::String(negative.clone()));
        }
        if let Some(dims) = request.dimensions {
            input.insert("width".into(), dims.width.into());
            input.insert("height".into(), dims.height.into());
        }
        match request.image_inputs.as_slice() {
            [] => {}
            [single] => {
                input.insert("image".into(), Value::String(single.clone()));
            }
            many => {
                input.insert(
                    "images".into(),
                    Value::Array(many.iter().cloned().map(Value::String).collect()),
                );
            }
        }

        Value::Object(input)
    }
}
