//! Per-modality indexing pipelines.
//!
//! Each pipeline turns discovered paths into stored records and reports a
//! per-item [`ItemOutcome`]. Outcomes are transient; only their aggregate
//! [`PhaseCounts`] survive into the job record.

pub mod image;
pub mod text;
pub mod video;

use serde::Serialize;

/// Error marker for an item skipped because its content hash already
/// exists in the store.
pub const DUPLICATE_CONTENT_HASH: &str = "DUPLICATE_CONTENT_HASH";

/// Outcome of indexing one file, video, or image.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub indexed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    pub fn indexed(path: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: Some(id.into()),
            indexed: true,
            error: None,
        }
    }

    /// Already present in the store; counts as a skip, not an error.
    pub fn duplicate(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: None,
            indexed: true,
            error: Some(DUPLICATE_CONTENT_HASH.to_string()),
        }
    }

    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: None,
            indexed: false,
            error: Some(error.into()),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.error.as_deref() == Some(DUPLICATE_CONTENT_HASH)
    }
}

/// Running counters for one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseCounts {
    pub found: u64,
    pub indexed: u64,
    pub errors: u64,
    pub skipped: u64,
}

impl PhaseCounts {
    /// Fold one outcome into the counters. Duplicates are skips; anything
    /// else with an error is an error; the rest indexed.
    pub fn absorb(&mut self, outcome: &ItemOutcome) {
        if outcome.is_duplicate() {
            self.skipped += 1;
        } else if outcome.indexed {
            self.indexed += 1;
        } else {
            self.errors += 1;
        }
    }
}
