use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, MediaKind, Timestamp};

/// A completed generation, appended to the external history store after a
/// successful commit. Entries are write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: uuid::Uuid,
    /// Final media URL attached to the placeholder.
    pub source_url: String,
    pub dimensions: Dimensions,
    pub created_at: Timestamp,
    pub kind: MediaKind,
    /// Model identifier that produced the media.
    pub model: String,
    /// Whether the URL was synthesized by a dry run.
    #[serde(default)]
    pub dry_run: bool,
}

impl HistoryEntry {
    pub fn new(
        source_url: impl Into<String>,
        dimensions: Dimensions,
        kind: MediaKind,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            source_url: source_url.into(),
            dimensions,
            created_at: chrono::Utc::now(),
            kind,
            model: model.into(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
