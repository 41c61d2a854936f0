/// Every failure a generation can end in.
///
/// Errors raised by the job client, the normalizer, staging, and
/// transformation stages all use this type and propagate unmodified up to
/// the orchestrator, which is the single place that tags the placeholder
/// and notifies the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The submission request was rejected or could not be sent.
    #[error("Submission failed{}: {message}", fmt_status(.status))]
    Submission {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        message: String,
    },

    #[error("Submission response did not contain a job id")]
    MissingJobId,

    /// A status request failed at the network or HTTP level.
    #[error("Polling failed: {0}")]
    PollingNetwork(String),

    /// The remote service explicitly reported failure.
    #[error("Remote job failed: {0}")]
    RemoteFailed(String),

    /// The remote service reported the job as cancelled.
    #[error("Remote job {job_id} was cancelled")]
    RemoteCancelled { job_id: String },

    /// The local cancellation token was signalled.
    #[error("Generation cancelled")]
    Cancelled,

    /// The polling attempt budget was exhausted.
    #[error("Job did not finish after {attempts} status checks")]
    TimedOut { attempts: u32 },

    /// The job reached `Success` but carried no output payload.
    #[error("Job {job_id} succeeded without an output payload")]
    MissingOutput { job_id: String },

    #[error("No media URL could be extracted from the job output")]
    NoExtractableOutput,

    /// A local resource could not be prepared or uploaded.
    #[error("Staging failed: {0}")]
    Staging(String),

    /// A transformation stage aborted the generation.
    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// A host engine call failed.
    #[error("Host engine error: {0}")]
    Host(String),

    /// The history store rejected an entry.
    #[error("History store error: {0}")]
    History(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl GenerationError {
    /// Stable snake_case code, used in events and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Submission { .. } => "submission",
            Self::MissingJobId => "missing_job_id",
            Self::PollingNetwork(_) => "polling_network",
            Self::RemoteFailed(_) => "remote_failed",
            Self::RemoteCancelled { .. } => "remote_cancelled",
            Self::Cancelled => "cancelled",
            Self::TimedOut { .. } => "timed_out",
            Self::MissingOutput { .. } => "missing_output",
            Self::NoExtractableOutput => "no_extractable_output",
            Self::Staging(_) => "staging",
            Self::Stage { .. } => "stage",
            Self::Host(_) => "host",
            Self::History(_) => "history",
            Self::Config(_) => "config",
        }
    }

    /// Text shown on an errored placeholder.
    ///
    /// Remote failure messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Build a stage failure from any displayable error.
    pub fn stage(stage: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: err.to_string(),
        }
    }
}

/// Result alias used across the workspace.
pub type GenerationResult<T> = Result<T, GenerationError>;
