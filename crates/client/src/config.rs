use std::time::Duration;

use genflow_core::GenerationError;

use crate::poll::PollConfig;

/// Which submission protocol the remote service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVariant {
    /// REST resources: `POST /predictions`, `GET /predictions/{id}`.
    Prediction,
    /// One endpoint for everything, discriminated by `task_type`.
    Task,
}

impl ApiVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prediction => "prediction",
            Self::Task => "task",
        }
    }

    pub fn parse(s: &str) -> Result<Self, GenerationError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prediction" => Ok(Self::Prediction),
            "task" => Ok(Self::Task),
            other => Err(GenerationError::Config(format!(
                "Invalid GENFLOW_API_VARIANT: '{other}'. Must be one of: prediction, task"
            ))),
        }
    }

    /// Provider constants used when no override is configured.
    pub fn default_poll_config(&self) -> PollConfig {
        match self {
            Self::Prediction => PollConfig::new(Duration::from_secs(2), 150),
            Self::Task => PollConfig::new(Duration::from_secs(3), 200),
        }
    }
}

/// Remote service configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL (prediction variant) or task endpoint (task variant).
    pub endpoint: String,
    pub variant: ApiVariant,
    /// Binary upload endpoint used by staging.
    pub upload_url: Option<String>,
    /// Headers added to every request, e.g. for an authenticating proxy.
    pub extra_headers: Vec<(String, String)>,
    pub poll_interval: Option<Duration>,
    pub poll_max_attempts: Option<u32>,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

/// Default per-request HTTP timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, variant: ApiVariant) -> Self {
        Self {
            endpoint: endpoint.into(),
            variant,
            upload_url: None,
            extra_headers: Vec::new(),
            poll_interval: None,
            poll_max_attempts: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                        | Default           |
    /// |--------------------------------|-------------------|
    /// | `GENFLOW_ENDPOINT`             | required          |
    /// | `GENFLOW_API_VARIANT`          | `prediction`      |
    /// | `GENFLOW_UPLOAD_URL`           | unset             |
    /// | `GENFLOW_EXTRA_HEADERS`        | empty             |
    /// | `GENFLOW_POLL_INTERVAL_MS`     | variant default   |
    /// | `GENFLOW_POLL_MAX_ATTEMPTS`    | variant default   |
    /// | `GENFLOW_REQUEST_TIMEOUT_SECS` | `60`              |
    ///
    /// `GENFLOW_EXTRA_HEADERS` holds `Name: value` pairs separated by `;`.
    pub fn from_env() -> Result<Self, GenerationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GenerationError> {
        let endpoint = lookup("GENFLOW_ENDPOINT")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GenerationError::Config("GENFLOW_ENDPOINT must be set".into()))?;

        let variant = match lookup("GENFLOW_API_VARIANT") {
            Some(v) => ApiVariant::parse(&v)?,
            None => ApiVariant::Prediction,
        };

        let upload_url = lookup("GENFLOW_UPLOAD_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let extra_headers = match lookup("GENFLOW_EXTRA_HEADERS") {
            Some(raw) => parse_headers(&raw)?,
            None => Vec::new(),
        };

        let poll_interval = parse_number::<u64>(&lookup, "GENFLOW_POLL_INTERVAL_MS")?
            .map(Duration::from_millis);

        let poll_max_attempts = parse_number::<u32>(&lookup, "GENFLOW_POLL_MAX_ATTEMPTS")?;
        if poll_max_attempts == Some(0) {
            return Err(GenerationError::Config(
                "GENFLOW_POLL_MAX_ATTEMPTS must be at least 1".into(),
            ));
        }

        let request_timeout = parse_number::<u64>(&lookup, "GENFLOW_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));

        Ok(Self {
            endpoint,
            variant,
            upload_url,
            extra_headers,
            poll_interval,
            poll_max_attempts,
            request_timeout,
        })
    }

    /// Effective polling parameters: variant defaults with overrides applied.
    pub fn poll_config(&self) -> PollConfig {
        let defaults = self.variant.default_poll_config();
        PollConfig::new(
            self.poll_interval.unwrap_or(defaults.interval),
            self.poll_max_attempts.unwrap_or(defaults.max_attempts),
        )
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, GenerationError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GenerationError::Config(format!("{key} must be a number, got '{raw}'"))),
    }
}

fn parse_headers(raw: &str) -> Result<Vec<(String, String)>, GenerationError> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once(':').ok_or_else(|| {
                GenerationError::Config(format!(
                    "GENFLOW_EXTRA_HEADERS entry '{pair}' must look like 'Name: value'"
                ))
            })?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
