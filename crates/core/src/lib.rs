//! Core domain types for the genflow generation subsystem.
//!
//! Holds the remote job model, the error taxonomy shared by every crate,
//! the result normalizer, and the per-model adapter interface. Nothing in
//! this crate performs I/O.

pub mod adapter;
pub mod error;
pub mod history;
pub mod job;
pub mod normalize;
pub mod types;

pub use adapter::{
    DEFAULT_MEDIA_INPUT_KEYS, GenerationRequest, GenericAdapter, ModelAdapter,
};
pub use error::{GenerationError, GenerationResult};
pub use history::HistoryEntry;
pub use job::{Job, JobStatus};
pub use normalize::{normalize, NormalizedMedia, NormalizedResult};
pub use types::{Dimensions, MediaKind, Timestamp};
