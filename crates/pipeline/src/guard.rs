//! Exactly-once settlement of a placeholder.

use std::sync::Arc;

use genflow_core::GenerationError;

use crate::engine::{HostEngine, LifecycleState, PlaceholderHandle};

/// Message tagged on placeholders whose generation was dropped mid-flight.
pub const INTERRUPTED_MESSAGE: &str = "Generation was interrupted";

/// Owns the obligation to move a placeholder out of `Pending`.
///
/// [`commit`](Self::commit) and [`fail`](Self::fail) consume the guard.
/// If the guard is dropped unsettled (the generation future was aborted),
/// `Drop` spawns a best-effort `Error` tag on the current runtime.
pub struct PlaceholderGuard {
    engine: Arc<dyn HostEngine>,
    handle: PlaceholderHandle,
    settled: bool,
}

impl PlaceholderGuard {
    pub fn new(engine: Arc<dyn HostEngine>, handle: PlaceholderHandle) -> Self {
        Self {
            engine,
            handle,
            settled: false,
        }
    }

    pub fn handle(&self) -> &PlaceholderHandle {
        &self.handle
    }

    /// Attach `url` and tag `Ready`.
    ///
    /// On error the placeholder is tagged `Error` instead and the error is
    /// returned, so the guard is settled either way.
    pub async fn commit(mut self, url: &str) -> Result<(), GenerationError> {
        let committed = async {
            self.engine.commit_content(&self.handle, url).await?;
            self.engine.tag_state(&self.handle, &LifecycleState::Ready).await
        }
        .await;

        match committed {
            Ok(()) => {
                self.settled = true;
                Ok(())
            }
            Err(e) => {
                self.settle_error(&e.user_message()).await;
                Err(e)
            }
        }
    }

    /// Tag `Error` with a user-facing message.
    pub async fn fail(mut self, message: &str) {
        self.settle_error(message).await;
    }

    /// Only marks the guard settled once the tag call has returned, so an
    /// abort while tagging still leaves `Drop` responsible for the placeholder.
    async fn settle_error(&mut self, message: &str) {
        let state = LifecycleState::Error {
            message: message.to_string(),
        };
        if let Err(e) = self.engine.tag_state(&self.handle, &state).await {
            tracing::error!(
                placeholder = %self.handle,
                error = %e,
                "Failed to tag placeholder as errored",
            );
        }
        self.settled = true;
    }
}

impl Drop for PlaceholderGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                placeholder = %self.handle,
                "Placeholder left pending with no runtime to settle it",
            );
            return;
        };

        tracing::warn!(
            placeholder = %self.handle,
            "Generation dropped before settling, tagging placeholder",
        );
        let engine = Arc::clone(&self.engine);
        let handle = self.handle.clone();
        runtime.spawn(async move {
            let state = LifecycleState::Error {
                message: INTERRUPTED_MESSAGE.to_string(),
            };
            if let Err(e) = engine.tag_state(&handle, &state).await {
                tracing::error!(
                    placeholder = %handle,
                    error = %e,
                    "Failed to tag interrupted placeholder",
                );
            }
        });
    }
}

impl std::fmt::Debug for PlaceholderGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceholderGuard")
            .field("handle", &self.handle)
            .field("settled", &self.settled)
            .finish()
    }
}
