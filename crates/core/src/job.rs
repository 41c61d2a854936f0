//! Remote job model and status parsing.
//!
//! A [`Job`] is only ever produced from responses of the remote service.
//! The orchestrator reads jobs but never mutates them.

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Remote-reported state of a job.
///
/// `TimedOut` is deliberately absent: it is a client-side decision and is
/// surfaced as [`GenerationError::TimedOut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Processing,
    Success,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a remote status string.
    ///
    /// Services disagree on vocabulary, so several spellings map to each
    /// state. Unknown values are treated as still in progress.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "starting" | "queued" | "pending" | "submitted" => Self::Starting,
            "processing" | "running" | "in_progress" => Self::Processing,
            "success" | "succeeded" | "completed" | "complete" => Self::Success,
            "failed" | "failure" | "error" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            other => {
                tracing::debug!(status = other, "Unknown remote status, treating as processing");
                Self::Processing
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A remote unit of work as last reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Opaque handle returned at submission.
    pub id: String,
    pub status: JobStatus,
    /// Provider-defined payload, present on `Success`.
    #[serde(default)]
    pub raw_output: Option<serde_json::Value>,
    /// Remote failure description, present on `Failed`.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            raw_output: None,
            error_message: None,
        }
    }

    /// Resolve a terminal job into its output payload.
    ///
    /// - `Success` with a payload returns the job unchanged.
    /// - `Success` without a payload is [`GenerationError::MissingOutput`].
    /// - `Failed` becomes [`GenerationError::RemoteFailed`] carrying the
    ///   remote message.
    /// - `Cancelled` becomes [`GenerationError::RemoteCancelled`].
    ///
    /// Non-terminal jobs are returned unchanged; callers only invoke this
    /// once [`JobStatus::is_terminal`] holds.
    pub fn into_terminal_result(self) -> Result<Job, GenerationError> {
        match self.status {
            JobStatus::Success if !has_payload(self.raw_output.as_ref()) => {
                Err(GenerationError::MissingOutput { job_id: self.id })
            }
            JobStatus::Failed => Err(GenerationError::RemoteFailed(
                self.error_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Remote job failed without a message".to_string()),
            )),
            JobStatus::Cancelled => Err(GenerationError::RemoteCancelled { job_id: self.id }),
            _ => Ok(self),
        }
    }
}

fn has_payload(output: Option<&serde_json::Value>) -> bool {
    !matches!(output, None | Some(serde_json::Value::Null))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_provider_vocabularies() {
        assert_eq!(JobStatus::parse("starting"), JobStatus::Starting);
        assert_eq!(JobStatus::parse("QUEUED"), JobStatus::Starting);
        assert_eq!(JobStatus::parse("processing"), JobStatus::Processing);
        assert_eq!(JobStatus::parse("running"), JobStatus::Processing);
        assert_eq!(JobStatus::parse("succeeded"), JobStatus::Success);
        assert_eq!(JobStatus::parse("success"), JobStatus::Success);
        assert_eq!(JobStatus::parse("failed"), JobStatus::Failed);
        assert_eq!(JobStatus::parse("canceled"), JobStatus::Cancelled);
        assert_eq!(JobStatus::parse(" Cancelled "), JobStatus::Cancelled);
    }

    #[test]
    fn unknown_status_is_not_terminal() {
        let status = JobStatus::parse("warming_up");
        assert_eq!(status, JobStatus::Processing);
        assert!(!status.is_terminal());
    }

    #[test]
    fn success_with_payload_resolves() {
        let mut job = Job::new("j1", JobStatus::Success);
        job.raw_output = Some(json!("https://cdn/x.png"));
        let job = job.into_terminal_result().unwrap();
        assert_eq!(job.id, "j1");
    }

    #[test]
    fn success_without_payload_is_missing_output() {
        let job = Job::new("j1", JobStatus::Success);
        assert_matches!(
            job.into_terminal_result(),
            Err(GenerationError::MissingOutput { job_id }) if job_id == "j1"
        );

        let mut job = Job::new("j2", JobStatus::Success);
        job.raw_output = Some(serde_json::Value::Null);
        assert_matches!(
            job.into_terminal_result(),
            Err(GenerationError::MissingOutput { .. })
        );
    }

    #[test]
    fn failed_carries_remote_message() {
        let mut job = Job::new("j1", JobStatus::Failed);
        job.error_message = Some("bad prompt".into());
        assert_matches!(
            job.into_terminal_result(),
            Err(GenerationError::RemoteFailed(msg)) if msg == "bad prompt"
        );
    }

    #[test]
    fn failed_without_message_gets_default() {
        let job = Job::new("j1", JobStatus::Failed);
        assert_matches!(
            job.into_terminal_result(),
            Err(GenerationError::RemoteFailed(msg)) if !msg.is_empty()
        );
    }

    #[test]
    fn remote_cancel_is_distinct_from_local_cancel() {
        let job = Job::new("j9", JobStatus::Cancelled);
        assert_matches!(
            job.into_terminal_result(),
            Err(GenerationError::RemoteCancelled { job_id }) if job_id == "j9"
        );
    }
}
