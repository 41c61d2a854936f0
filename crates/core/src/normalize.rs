//! Canonical media extraction from heterogeneous success payloads.
//!
//! Remote services do not agree on the shape of a successful output: some
//! return a bare URL, some an array of URLs, some an object with one of
//! several well-known keys. [`normalize`] classifies the payload into an
//! [`OutputShape`] and extracts an ordered list of [`NormalizedMedia`].
//!
//! The object key order in [`OBJECT_KEY_PRIORITY`] decides which key wins
//! when a service populates several of them at once. It was inferred from
//! observed provider responses and should be reconfirmed when a new
//! provider is added.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GenerationError;
use crate::types::MediaKind;

/// Object keys checked for URLs, highest priority first.
pub const OBJECT_KEY_PRIORITY: &[&str] =
    &["images", "image", "url", "image_url", "result", "output"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// One extracted media reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMedia {
    pub kind: MediaKind,
    pub url: String,
}

/// Non-empty, ordered list of media extracted from one payload.
pub type NormalizedResult = Vec<NormalizedMedia>;

// ---------------------------------------------------------------------------
// Shape classification
// ---------------------------------------------------------------------------

/// The accepted payload shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputShape<'a> {
    /// A string that is an HTTP(S) URL.
    Url(&'a str),
    List(&'a [Value]),
    Object(&'a Map<String, Value>),
    /// Anything else: numbers, booleans, null, non-URL strings.
    Unrecognized,
}

/// Classify a raw payload by its runtime JSON type.
pub fn classify(raw: &Value) -> OutputShape<'_> {
    match raw {
        Value::String(s) if is_http_url(s) => OutputShape::Url(s),
        Value::Array(items) => OutputShape::List(items),
        Value::Object(map) => OutputShape::Object(map),
        _ => OutputShape::Unrecognized,
    }
}

/// Whether `s` starts with an HTTP(S) scheme.
pub fn is_http_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract the canonical media list from a success payload.
///
/// Rules, first match wins:
/// 1. An HTTP(S) string is the sole result.
/// 2. An array yields its HTTP(S) string elements in order.
/// 3. An object yields the first key of [`OBJECT_KEY_PRIORITY`] holding a
///    qualifying string or an array with at least one qualifying string.
/// 4. Otherwise [`GenerationError::NoExtractableOutput`].
///
/// `fallback_kind` is used for URLs whose extension does not reveal the
/// media kind.
pub fn normalize(
    raw: &Value,
    fallback_kind: MediaKind,
) -> Result<NormalizedResult, GenerationError> {
    let urls = match classify(raw) {
        OutputShape::Url(url) => vec![url],
        OutputShape::List(items) => qualifying_strings(items),
        OutputShape::Object(map) => first_keyed_urls(map),
        OutputShape::Unrecognized => Vec::new(),
    };

    if urls.is_empty() {
        return Err(GenerationError::NoExtractableOutput);
    }

    Ok(urls
        .into_iter()
        .map(|url| NormalizedMedia {
            kind: infer_kind(url, fallback_kind),
            url: url.to_string(),
        })
        .collect())
}

fn qualifying_strings(items: &[Value]) -> Vec<&str> {
    items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| is_http_url(s))
        .collect()
}

fn first_keyed_urls(map: &Map<String, Value>) -> Vec<&str> {
    for key in OBJECT_KEY_PRIORITY {
        let urls = match map.get(*key) {
            Some(Value::String(s)) if is_http_url(s) => vec![s.as_str()],
            Some(Value::Array(items)) => qualifying_strings(items),
            _ => continue,
        };
        if !urls.is_empty() {
            return urls;
        }
    }
    Vec::new()
}

/// Infer the media kind from the URL path extension.
pub fn infer_kind(url: &str, fallback: MediaKind) -> MediaKind {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let Some((_, ext)) = path.rsplit_once('.') else {
        return fallback;
    };
    let ext = ext.to_ascii_lowercase();
    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Image
    } else {
        fallback
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
