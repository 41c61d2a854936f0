//! Log-based notification sink.
//!
//! [`NotificationLog`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and emits one `tracing` event per generation event. Failures are
//! logged at `warn` with the user-facing message. It runs as a
//! long-lived background task and stops when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::{GenerationEvent, GenerationEventKind};

pub struct NotificationLog;

impl NotificationLog {
    /// Run the notification loop until the channel closes.
    ///
    /// Returns the number of events handled.
    pub async fn run(mut receiver: broadcast::Receiver<GenerationEvent>) -> u64 {
        let mut handled = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::notify(&event);
                    handled += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Notification log lagged, some events were dropped",
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, notification log shutting down");
                    break;
                }
            }
        }
        handled
    }

    fn notify(event: &GenerationEvent) {
        let id = event.generation_id;
        match &event.kind {
            GenerationEventKind::Started { model, dimensions, dry_run } => {
                tracing::debug!(
                    generation_id = %id,
                    model,
                    %dimensions,
                    dry_run,
                    "Generation started",
                );
            }
            GenerationEventKind::Submitted { job_id } => {
                tracing::debug!(generation_id = %id, job_id, "Generation submitted");
            }
            GenerationEventKind::Completed { url, dry_run } => {
                tracing::info!(generation_id = %id, url, dry_run, "Generation completed");
            }
            GenerationEventKind::Failed { error_kind, message } => {
                tracing::warn!(generation_id = %id, error_kind, message, "Generation failed");
            }
            GenerationEventKind::HistoryFailed { message } => {
                tracing::warn!(generation_id = %id, message, "Generation not recorded in history");
            }
        }
    }
}
