//! End-to-end coordination of one generation request.
//!
//! [`GenerationOrchestrator::generate`] creates and tags the placeholder
//! before any network call, runs the transformation pipeline, stages local
//! resources, drives the job client, normalizes the result, commits it and
//! records history. It is the single place where errors from below are
//! caught, turned into an `Error` tag, and reported.

use std::sync::Arc;

use genflow_client::{ClientConfig, HttpContext, HttpUploader, JobClient, SubmitRequest, Uploader};
use genflow_core::{
    normalize, Dimensions, GenerationError, GenerationRequest, HistoryEntry, MediaKind,
    ModelAdapter, NormalizedMedia, NormalizedResult,
};
use genflow_events::{EventBus, GenerationEvent, GenerationEventKind};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::blob::BlobSource;
use crate::config::OrchestratorConfig;
use crate::dry_run;
use crate::engine::{HostEngine, LifecycleState, PlaceholderHandle};
use crate::guard::PlaceholderGuard;
use crate::history::HistoryStore;
use crate::stage::{Pipeline, StageContext};
use crate::staging::{has_local_handles, ResourceStager};

/// Caller-supplied hook invoked with every generation failure.
pub type ErrorHandler = Arc<dyn Fn(&GenerationError) + Send + Sync>;

/// What a successful generation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub generation_id: Uuid,
    pub placeholder: PlaceholderHandle,
    /// URL committed to the placeholder, after output stages.
    pub url: String,
    /// Every media item the remote job returned, before output stages.
    pub results: NormalizedResult,
    /// Remote job id; `None` for dry runs.
    pub job_id: Option<String>,
    /// `None` when the history append failed after commit.
    pub history: Option<HistoryEntry>,
    pub dry_run: bool,
}

/// Result of the network (or dry-run) phase.
struct Produced {
    url: String,
    results: NormalizedResult,
    job_id: Option<String>,
}

pub struct GenerationOrchestrator {
    engine: Arc<dyn HostEngine>,
    client: JobClient,
    history: Arc<dyn HistoryStore>,
    stager: Option<Arc<ResourceStager>>,
    pipeline: Pipeline,
    events: Arc<EventBus>,
    config: OrchestratorConfig,
    on_error: Option<ErrorHandler>,
}

impl GenerationOrchestrator {
    pub fn new(
        engine: Arc<dyn HostEngine>,
        client: JobClient,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            engine,
            client,
            history,
            stager: None,
            pipeline: Pipeline::new(),
            events: Arc::new(EventBus::default()),
            config: OrchestratorConfig::default(),
            on_error: None,
        }
    }

    /// Build the HTTP context once and wire the job client and, when an
    /// upload endpoint is configured, the resource stager to it.
    pub fn from_config(
        client_config: &ClientConfig,
        config: OrchestratorConfig,
        engine: Arc<dyn HostEngine>,
        history: Arc<dyn HistoryStore>,
        blobs: Arc<dyn BlobSource>,
    ) -> Self {
        let ctx = Arc::new(HttpContext::from_config(client_config));
        let client = JobClient::from_config(client_config, Arc::clone(&ctx));

        let stager = client_config.upload_url.as_ref().map(|url| {
            let uploader: Arc<dyn Uploader> =
                Arc::new(HttpUploader::new(Arc::clone(&ctx), url.clone()));
            Arc::new(ResourceStager::new(uploader, Arc::clone(&engine), blobs))
        });

        let mut orchestrator = Self::new(engine, client, history).with_config(config);
        orchestrator.stager = stager;
        orchestrator
    }

    pub fn with_stager(mut self, stager: Arc<ResourceStager>) -> Self {
        self.stager = Some(stager);
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.on_error = Some(handler);
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one generation end to end.
    ///
    /// Every failure after the placeholder exists leaves it tagged `Error`
    /// with [`GenerationError::user_message`]. Cancelling after commit has
    /// no effect.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        adapter: &dyn ModelAdapter,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, GenerationError> {
        let generation_id = Uuid::new_v4();
        let dimensions = adapter.estimate_dimensions(request);
        let dry_run = self.config.dry_run;

        let handle = match self.engine.create_placeholder(dimensions).await {
            Ok(handle) => handle,
            Err(e) => {
                self.report_failure(generation_id, &e);
                return Err(e);
            }
        };
        let guard = PlaceholderGuard::new(Arc::clone(&self.engine), handle.clone());

        if let Err(e) = self.engine.tag_state(&handle, &LifecycleState::Pending).await {
            guard.fail(&e.user_message()).await;
            self.report_failure(generation_id, &e);
            return Err(e);
        }

        tracing::info!(
            generation_id = %generation_id,
            placeholder = %handle,
            model = adapter.model(),
            %dimensions,
            dry_run,
            "Generation started",
        );
        self.publish(
            generation_id,
            GenerationEventKind::Started {
                model: adapter.model().to_string(),
                dimensions,
                dry_run,
            },
        );

        let ctx = StageContext::new(adapter.model(), dimensions, cancel.clone())
            .with_generation_id(generation_id)
            .with_media_keys(adapter.media_input_keys())
            .with_stager(self.stager.clone());

        let produced = match self.produce(request, adapter, &ctx).await {
            Ok(produced) => produced,
            Err(e) => {
                guard.fail(&e.user_message()).await;
                self.report_failure(generation_id, &e);
                return Err(e);
            }
        };

        if let Err(e) = guard.commit(&produced.url).await {
            self.report_failure(generation_id, &e);
            return Err(e);
        }

        tracing::info!(
            generation_id = %generation_id,
            placeholder = %handle,
            url = %produced.url,
            "Generation committed",
        );
        self.publish(
            generation_id,
            GenerationEventKind::Completed {
                url: produced.url.clone(),
                dry_run,
            },
        );

        let kind = produced
            .results
            .first()
            .map(|m| m.kind)
            .unwrap_or_else(|| adapter.output_kind());
        let entry = HistoryEntry::new(produced.url.clone(), dimensions, kind, adapter.model())
            .with_dry_run(dry_run);
        let history = match self.history.append(entry.clone()).await {
            Ok(()) => Some(entry),
            Err(e) => {
                tracing::error!(
                    generation_id = %generation_id,
                    url = %produced.url,
                    error = %e,
                    "History append failed after commit",
                );
                self.publish(
                    generation_id,
                    GenerationEventKind::HistoryFailed {
                        message: e.user_message(),
                    },
                );
                None
            }
        };

        Ok(GenerationOutcome {
            generation_id,
            placeholder: handle,
            url: produced.url,
            results: produced.results,
            job_id: produced.job_id,
            history,
            dry_run,
        })
    }

    /// Steps between a pending placeholder and a final URL.
    async fn produce(
        &self,
        request: &GenerationRequest,
        adapter: &dyn ModelAdapter,
        ctx: &StageContext,
    ) -> Result<Produced, GenerationError> {
        let input = self.pipeline.run_input(adapter.map_input(request), ctx).await?;

        if self.config.dry_run {
            return self.produce_dry_run(adapter.output_kind(), ctx.dimensions, &ctx.cancel).await;
        }

        let input = if has_local_handles(&input, &ctx.media_keys) {
            let stager = self.stager.as_ref().ok_or_else(|| {
                GenerationError::Staging(
                    "Input contains local resources but no upload endpoint is configured".into(),
                )
            })?;
            stager.stage_input(input, &ctx.media_keys, &ctx.cancel).await?
        } else {
            input
        };

        if ctx.cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let version = adapter.version().map(str::to_string);
        let submit = SubmitRequest::new(adapter.model(), version, input);
        let receipt = self.client.submit(&submit).await?;
        self.publish(
            ctx.generation_id,
            GenerationEventKind::Submitted {
                job_id: receipt.job_id.clone(),
            },
        );

        let job = match receipt.terminal_job() {
            Some(job) => job.clone().into_terminal_result()?,
            None => self.client.poll(&receipt.job_id, &ctx.cancel).await?,
        };

        let raw = job
            .raw_output
            .ok_or_else(|| GenerationError::MissingOutput { job_id: job.id.clone() })?;
        let results = normalize(&adapter.map_output(raw), adapter.output_kind())?;
        let first = results.first().ok_or(GenerationError::NoExtractableOutput)?;

        let url = self.pipeline.run_output(first.url.clone(), ctx).await?;

        Ok(Produced {
            url,
            results,
            job_id: Some(job.id),
        })
    }

    async fn produce_dry_run(
        &self,
        kind: MediaKind,
        dimensions: Dimensions,
        cancel: &CancellationToken,
    ) -> Result<Produced, GenerationError> {
        let url = dry_run::run(kind, dimensions, self.config.dry_run_delay, cancel).await?;
        Ok(Produced {
            results: vec![NormalizedMedia { kind, url: url.clone() }],
            url,
            job_id: None,
        })
    }

    fn report_failure(&self, generation_id: Uuid, err: &GenerationError) {
        match err {
            GenerationError::Cancelled => {
                tracing::warn!(generation_id = %generation_id, "Generation cancelled");
            }
            other => {
                tracing::warn!(
                    generation_id = %generation_id,
                    kind = other.kind(),
                    error = %other,
                    "Generation failed",
                );
            }
        }

        self.publish(
            generation_id,
            GenerationEventKind::Failed {
                error_kind: err.kind().to_string(),
                message: err.user_message(),
            },
        );

        if let Some(handler) = &self.on_error {
            handler(err);
        }
    }

    fn publish(&self, generation_id: Uuid, kind: GenerationEventKind) {
        self.events.publish(GenerationEvent::new(generation_id, kind));
    }
}

impl std::fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("client", &self.client)
            .field("pipeline", &self.pipeline)
            .field("staging", &self.stager.is_some())
            .field("config", &self.config)
            .finish()
    }
}
