//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans [`GenerationEvent`]s out to any number of
//! subscribers. Share it via `Arc<EventBus>` between orchestrators.

use chrono::{DateTime, Utc};
use genflow_core::Dimensions;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// GenerationEvent
// ---------------------------------------------------------------------------

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEventKind {
    /// Placeholder created and tagged pending.
    Started {
        model: String,
        dimensions: Dimensions,
        dry_run: bool,
    },
    /// The remote service accepted the job.
    Submitted { job_id: String },
    /// Final content committed to the placeholder.
    Completed { url: String, dry_run: bool },
    /// The generation failed and the placeholder was tagged as errored.
    Failed {
        /// Stable error code, see `GenerationError::kind`.
        error_kind: String,
        /// Text suitable for showing to the user.
        message: String,
    },
    /// Content was committed but the history record could not be written.
    HistoryFailed { message: String },
}

/// One lifecycle event of a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationEvent {
    /// Identifies the generation request across all of its events.
    pub generation_id: Uuid,

    #[serde(flatten)]
    pub kind: GenerationEventKind,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl GenerationEvent {
    pub fn new(generation_id: Uuid, kind: GenerationEventKind) -> Self {
        Self {
            generation_id,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Dot-separated event name, e.g. `"generation.completed"`.
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            GenerationEventKind::Started { .. } => "generation.started",
            GenerationEventKind::Submitted { .. } => "generation.submitted",
            GenerationEventKind::Completed { .. } => "generation.completed",
            GenerationEventKind::Failed { .. } => "generation.failed",
            GenerationEventKind::HistoryFailed { .. } => "generation.history_failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            GenerationEventKind::Failed { .. } | GenerationEventKind::HistoryFailed { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// ```rust
/// use genflow_events::{EventBus, GenerationEvent, GenerationEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(GenerationEvent::new(
///     uuid::Uuid::new_v4(),
///     GenerationEventKind::Submitted { job_id: "p1".into() },
/// ));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<GenerationEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unread events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Without subscribers the event is dropped.
    pub fn publish(&self, event: GenerationEvent) {
        // SendError only means there are no receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
