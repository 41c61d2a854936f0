//! Sequential status polling for a submitted job.
//!
//! [`poll_until_terminal`] drives one job to a terminal state. Polling is
//! strictly sequential: the remote service is the only source of truth on
//! progress, so exactly one status request is in flight at a time and the
//! next one is scheduled from the moment the previous response arrived.
//!
//! Cancellation is cooperative. The token is checked at the top of every
//! iteration and raced against the inter-poll wait, so once it fires no
//! further status request is issued.

use std::time::Duration;

use genflow_core::{GenerationError, Job};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::transport::JobTransport;

/// Interval and attempt budget for one polling run.
///
/// The effective time-out is `interval * max_attempts`, enforced locally
/// regardless of any server-side limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on how long polling can take.
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Progress of a polling run.
#[derive(Debug, Clone, Copy)]
struct PollState {
    attempts: u32,
    next_poll_at: Instant,
}

/// Poll `job_id` until the remote service reports a terminal status.
///
/// Returns the successful [`Job`], or:
/// - [`GenerationError::Cancelled`] once `cancel` is signalled,
/// - [`GenerationError::TimedOut`] after `max_attempts` non-terminal polls,
/// - the transport's error if a status request fails (never retried),
/// - the error derived from a `Failed`/`Cancelled`/payload-less `Success`
///   terminal status (see [`Job::into_terminal_result`]).
pub async fn poll_until_terminal(
    transport: &dyn JobTransport,
    job_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<Job, GenerationError> {
    let mut state = PollState {
        attempts: 0,
        next_poll_at: Instant::now() + config.interval,
    };

    loop {
        if cancel.is_cancelled() {
            tracing::warn!(job_id, attempts = state.attempts, "Polling cancelled");
            return Err(GenerationError::Cancelled);
        }

        if state.attempts >= config.max_attempts {
            tracing::warn!(
                job_id,
                attempts = state.attempts,
                budget_ms = config.budget().as_millis() as u64,
                "Polling budget exhausted",
            );
            return Err(GenerationError::TimedOut {
                attempts: state.attempts,
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(
                    job_id,
                    attempts = state.attempts,
                    "Polling cancelled while waiting",
                );
                return Err(GenerationError::Cancelled);
            }
            _ = tokio::time::sleep_until(state.next_poll_at) => {}
        }

        state.attempts += 1;
        let job = transport.fetch_status(job_id).await?;

        tracing::debug!(
            job_id,
            attempt = state.attempts,
            status = %job.status,
            "Polled job status",
        );

        if job.status.is_terminal() {
            tracing::info!(
                job_id,
                status = %job.status,
                attempts = state.attempts,
                "Job reached terminal status",
            );
            return job.into_terminal_result();
        }

        state.next_poll_at = Instant::now() + config.interval;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
