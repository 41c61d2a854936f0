//! Parsing of loosely-specified response bodies.
//!
//! Services differ in how they name the job id, whether they wrap the
//! payload in `{ "data": [...] }`, and how they report errors. These
//! helpers read a [`Value`] by probing known keys rather than binding to one schema.

use genflow_core::{Job, JobStatus};
use serde_json::Value;

/// Keys that may hold the job identifier, in lookup order.
const JOB_ID_KEYS: &[&str] = &["jobId", "job_id", "id", "task_id", "taskId"];

/// Strip a `{ "data": ... }` envelope.
///
/// Only unwraps when the outer object has no id or status of its own, so a
/// job body that happens to contain a `data` field is left alone.
pub fn unwrap_envelope(body: &Value) -> &Value {
    let Some(map) = body.as_object() else {
        return body;
    };
    if map.contains_key("status") || JOB_ID_KEYS.iter().any(|k| map.contains_key(*k)) {
        return body;
    }
    match map.get("data") {
        Some(Value::Array(items)) => items.first().unwrap_or(body),
        Some(inner @ Value::Object(_)) => inner,
        _ => body,
    }
}

/// The job id, as a string, if any known key carries one.
pub fn job_id(body: &Value) -> Option<String> {
    JOB_ID_KEYS.iter().find_map(|key| match body.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Error messages from an `errors` array or a top-level `error`/`detail`.
pub fn error_messages(body: &Value) -> Option<String> {
    let mut messages: Vec<String> = body
        .get("errors")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(message_of).collect())
        .unwrap_or_default();

    if messages.is_empty() {
        messages.extend(
            ["error", "detail"]
                .iter()
                .filter_map(|k| body.get(*k).and_then(message_of)),
        );
    }

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

/// Text of an error value: a string, or an object's `message`/`detail`.
fn message_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("detail"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Build a [`Job`] from a status-bearing body.
///
/// Returns `None` when the body has no `status` string. `fallback_id` is
/// used when the body omits the id.
pub fn job_from_body(body: &Value, fallback_id: &str) -> Option<Job> {
    let status = JobStatus::parse(body.get("status")?.as_str()?);
    let mut job = Job::new(job_id(body).unwrap_or_else(|| fallback_id.to_string()), status);

    job.raw_output = body.get("output").filter(|v| !v.is_null()).cloned();
    job.error_message = body.get("error").and_then(message_of);

    Some(job)
}
