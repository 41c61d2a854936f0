//! Host canvas engine interface.
//!
//! The host owns every visual resource. This crate only asks it to create
//! a placeholder, tag its lifecycle state, attach final content, and read
//! engine-internal buffers for staging.

use async_trait::async_trait;
use genflow_core::{Dimensions, GenerationError};
use serde::{Deserialize, Serialize};

/// Opaque reference to a placeholder owned by the host engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderHandle(String);

impl PlaceholderHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlaceholderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle tag rendered by the host (spinner, content, error badge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    Pending,
    Ready,
    Error { message: String },
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Error { .. } => "error",
        }
    }

    /// `Ready` and `Error` are final for a placeholder.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[async_trait]
pub trait HostEngine: Send + Sync {
    /// Create a placeholder of the given size and return its handle.
    async fn create_placeholder(
        &self,
        dimensions: Dimensions,
    ) -> Result<PlaceholderHandle, GenerationError>;

    async fn tag_state(
        &self,
        handle: &PlaceholderHandle,
        state: &LifecycleState,
    ) -> Result<(), GenerationError>;

    /// Attach the final media URL to the placeholder.
    async fn commit_content(
        &self,
        handle: &PlaceholderHandle,
        url: &str,
    ) -> Result<(), GenerationError>;

    /// Bytes of an engine-internal buffer, addressed by its id.
    async fn read_buffer(&self, buffer_id: &str) -> Result<Vec<u8>, GenerationError>;

    /// MIME type of an engine-internal buffer.
    async fn mime_type(&self, buffer_id: &str) -> Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_unsettled() {
        assert!(!LifecycleState::Pending.is_settled());
        assert!(LifecycleState::Ready.is_settled());
        assert!(LifecycleState::Error { message: "x".into() }.is_settled());
    }

    #[test]
    fn state_serializes_with_tag() {
        let state = LifecycleState::Error {
            message: "bad prompt".into(),
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json, serde_json::json!({"state": "error", "message": "bad prompt"}));
        assert_eq!(serde_json::to_value(PlaceholderHandle::new("h1")).unwrap(), "h1");
    }
}
