//! Transformation pipeline run around the remote call.
//!
//! Stages run strictly in order on the way in (mapped request input) and
//! in the same order on the way out (final URL). Any stage error aborts
//! the generation and propagates unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use genflow_core::{Dimensions, GenerationError, DEFAULT_MEDIA_INPUT_KEYS};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::staging::ResourceStager;

/// Per-generation data handed to every stage.
#[derive(Clone)]
pub struct StageContext {
    pub generation_id: Uuid,
    pub model: String,
    pub dimensions: Dimensions,
    pub cancel: CancellationToken,
    /// Input keys that may hold media handles, as reported by the adapter.
    pub media_keys: Vec<String>,
    /// Available when an upload endpoint is configured.
    pub stager: Option<Arc<ResourceStager>>,
}

impl StageContext {
    pub fn new(
        model: impl Into<String>,
        dimensions: Dimensions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            generation_id: Uuid::new_v4(),
            model: model.into(),
            dimensions,
            cancel,
            media_keys: DEFAULT_MEDIA_INPUT_KEYS.iter().map(|k| k.to_string()).collect(),
            stager: None,
        }
    }

    pub fn with_media_keys<K: AsRef<str>>(mut self, keys: &[K]) -> Self {
        self.media_keys = keys.iter().map(|k| k.as_ref().to_string()).collect();
        self
    }

    pub fn with_generation_id(mut self, id: Uuid) -> Self {
        self.generation_id = id;
        self
    }

    pub fn with_stager(mut self, stager: Option<Arc<ResourceStager>>) -> Self {
        self.stager = stager;
        self
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("generation_id", &self.generation_id)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("media_keys", &self.media_keys)
            .field("stager", &self.stager.is_some())
            .finish()
    }
}

/// One caller-supplied rewriting step. Both directions default to
/// pass-through.
#[async_trait]
pub trait TransformStage: Send + Sync {
    fn name(&self) -> &str;

    async fn transform_input(
        &self,
        input: Value,
        _ctx: &StageContext,
    ) -> Result<Value, GenerationError> {
        Ok(input)
    }

    async fn transform_output(
        &self,
        url: String,
        _ctx: &StageContext,
    ) -> Result<String, GenerationError> {
        Ok(url)
    }
}

/// Ordered list of stages.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn TransformStage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: Arc<dyn TransformStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub async fn run_input(
        &self,
        mut input: Value,
        ctx: &StageContext,
    ) -> Result<Value, GenerationError> {
        for stage in &self.stages {
            if ctx.cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            input = stage.transform_input(input, ctx).await.inspect_err(|e| {
                tracing::warn!(stage = stage.name(), error = %e, "Input stage failed");
            })?;
        }
        Ok(input)
    }

    pub async fn run_output(
        &self,
        mut url: String,
        ctx: &StageContext,
    ) -> Result<String, GenerationError> {
        for stage in &self.stages {
            if ctx.cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            url = stage.transform_output(url, ctx).await.inspect_err(|e| {
                tracing::warn!(stage = stage.name(), error = %e, "Output stage failed");
            })?;
        }
        Ok(url)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| s.name()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in stages
// ---------------------------------------------------------------------------

/// Uploads local resource handles found in the input.
///
/// The orchestrator stages the input after the pipeline anyway; adding
/// this stage earlier lets later stages see remote URLs.
#[derive(Debug, Default)]
pub struct StageResources;

#[async_trait]
impl TransformStage for StageResources {
    fn name(&self) -> &str {
        "stage_resources"
    }

    async fn transform_input(
        &self,
        input: Value,
        ctx: &StageContext,
    ) -> Result<Value, GenerationError> {
        match &ctx.stager {
            Some(stager) => stager.stage_input(input, &ctx.media_keys, &ctx.cancel).await,
            None => Ok(input),
        }
    }
}
