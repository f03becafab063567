//! Content hashing and duplicate detection against the graph store.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use trove_store::ContentStore;

/// Hash a file's contents with BLAKE3, returning the lowercase hex digest.
///
/// Runs on the blocking pool; files may be large.
pub async fn hash_file(path: &Path) -> Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read {} for hashing", path.display()))?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    })
    .await
    .context("hashing task panicked")?
}

/// Hash raw content already in memory.
pub fn hash_content(content: &str) -> String {
    hex::encode(blake3::hash(content.as_bytes()).as_bytes())
}

/// Duplicate lookups keyed by content hash.
///
/// A failed lookup is treated as "not a duplicate": indexing the same
/// content twice is recoverable, silently dropping new content is not.
pub struct Deduplicator {
    store: Arc<dyn ContentStore>,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Does a file record with this content hash already exist?
    pub async fn is_duplicate_file(&self, content_hash: &str) -> bool {
        match trove_store::ops::get_file_by_hash(self.store.as_ref(), content_hash).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!("duplicate lookup failed for file hash {content_hash}: {e}");
                false
            }
        }
    }

    /// Does a video record with this content hash already exist?
    pub async fn is_duplicate_video(&self, content_hash: &str) -> bool {
        match trove_store::ops::get_video_by_hash(self.store.as_ref(), content_hash).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!("duplicate lookup failed for video hash {content_hash}: {e}");
                false
            }
        }
    }
}
