//! Generation orchestration.
//!
//! Drives one user-initiated generation through its whole lifecycle: a
//! host-engine placeholder tagged `Pending` before any network call, the
//! caller's transformation pipeline, resource staging, the remote job,
//! result normalization, commit, and a history record.

pub mod blob;
pub mod config;
pub mod dry_run;
pub mod engine;
pub mod guard;
pub mod history;
pub mod orchestrator;
pub mod stage;
pub mod staging;

pub use blob::{BlobData, BlobRegistry, BlobSource};
pub use config::OrchestratorConfig;
pub use engine::{HostEngine, LifecycleState, PlaceholderHandle};
pub use guard::PlaceholderGuard;
pub use history::{HistoryStore, InMemoryHistory};
pub use orchestrator::{ErrorHandler, GenerationOrchestrator, GenerationOutcome};
pub use stage::{Pipeline, StageContext, StageResources, TransformStage};
pub use staging::{ResourceRef, ResourceStager};
