//! Batch-cursor scanning of a directory tree.
//!
//! The text phase consumes files one page at a time through the
//! [`ScanService`] protocol: every call returns one batch of
//! `(path, content)` pairs plus an opaque cursor to resume from. The
//! cursor is owned by the service; callers pass it back unchanged.
//!
//! Legacy scan backends predate the ignore-list parameters. The
//! [`BatchScanner`] adapter probes capability once per job and caches the
//! decision, so no per-call error sniffing is needed; a backend that still
//! reports [`ScanError::IgnoreListsUnsupported`] on the first full call
//! downgrades the adapter permanently for the rest of the job.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::classify::normalize_extension;

/// One page of a batch-cursor scan.
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    /// Text files discovered this page, with their contents.
    pub batch: Vec<(String, String)>,
    /// Opaque resumption cursor for the next call.
    pub next_cursor: u64,
    /// True when the walk is exhausted and the cursor is dead.
    pub done: bool,
    /// Text-classified, non-ignored files seen this page.
    pub scanned: usize,
    /// Files seen this page that were ignored, non-text, or unreadable.
    pub skipped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The backend does not accept ignore-list parameters (legacy arity).
    #[error("scan backend does not accept ignore lists")]
    IgnoreListsUnsupported,
    /// Any other scan failure; aborts the text phase.
    #[error("scan failed: {0}")]
    Failed(String),
}

/// A paginated directory-walk service.
///
/// Implementations may be remote; the in-process [`WalkScanner`] runs the
/// walk on the blocking pool.
#[async_trait]
pub trait ScanService: Send + Sync {
    /// Whether the backend accepts the ignore-list parameters.
    ///
    /// Probed once per job by [`BatchScanner`].
    fn supports_ignore_lists(&self) -> bool {
        true
    }

    /// Full-arity scan: text extensions plus ignore lists.
    async fn scan_with_ignore(
        &self,
        root: &Path,
        text_exts: &[String],
        ignore_exts: &[String],
        ignore_files: &[String],
        cursor: u64,
        batch_size: usize,
    ) -> Result<ScanBatch, ScanError>;

    /// Legacy 4-argument scan without ignore lists.
    async fn scan(
        &self,
        root: &Path,
        text_exts: &[String],
        cursor: u64,
        batch_size: usize,
    ) -> Result<ScanBatch, ScanError>;
}

/// Per-job adapter that pins the capability decision for its lifetime.
pub struct BatchScanner {
    service: Arc<dyn ScanService>,
    use_ignore_lists: bool,
}

impl BatchScanner {
    pub fn new(service: Arc<dyn ScanService>) -> Self {
        let use_ignore_lists = service.supports_ignore_lists();
        if !use_ignore_lists {
            debug!("scan backend predates ignore lists, using legacy form");
        }
        Self {
            service,
            use_ignore_lists,
        }
    }

    /// Fetch the next page, falling back to the legacy form permanently if
    /// the backend rejects the ignore-list arity.
    pub async fn next_batch(
        &mut self,
        root: &Path,
        text_exts: &[String],
        ignore_exts: &[String],
        ignore_files: &[String],
        cursor: u64,
        batch_size: usize,
    ) -> Result<ScanBatch, ScanError> {
        if self.use_ignore_lists {
            match self
                .service
                .scan_with_ignore(root, text_exts, ignore_exts, ignore_files, cursor, batch_size)
                .await
            {
                Err(ScanError::IgnoreListsUnsupported) => {
                    warn!("scan backend rejected ignore lists, falling back for this job");
                    self.use_ignore_lists = false;
                }
                other => return other,
            }
        }
        self.service.scan(root, text_exts, cursor, batch_size).await
    }
}

/// In-process walkdir-backed scan service.
///
/// The walk order is sorted by file name, so the cursor (an entry offset)
/// partitions a stable tree exactly: every matching file appears in
/// precisely one batch.
#[derive(Debug, Default, Clone)]
pub struct WalkScanner;

impl WalkScanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScanService for WalkScanner {
    async fn scan_with_ignore(
        &self,
        root: &Path,
        text_exts: &[String],
        ignore_exts: &[String],
        ignore_files: &[String],
        cursor: u64,
        batch_size: usize,
    ) -> Result<ScanBatch, ScanError> {
        let root = root.to_path_buf();
        let text_exts = normalize_set(text_exts);
        let ignore_exts = normalize_set(ignore_exts);
        let ignore_files: HashSet<String> =
            ignore_files.iter().map(|name| name.to_lowercase()).collect();

        tokio::task::spawn_blocking(move || {
            walk_batch(&root, &text_exts, &ignore_exts, &ignore_files, cursor, batch_size)
        })
        .await
        .map_err(|e| ScanError::Failed(format!("scan task panicked: {e}")))?
    }

    async fn scan(
        &self,
        root: &Path,
        text_exts: &[String],
        cursor: u64,
        batch_size: usize,
    ) -> Result<ScanBatch, ScanError> {
        self.scan_with_ignore(root, text_exts, &[], &[], cursor, batch_size)
            .await
    }
}

fn normalize_set(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn walk_batch(
    root: &PathBuf,
    text_exts: &HashSet<String>,
    ignore_exts: &HashSet<String>,
    ignore_files: &HashSet<String>,
    cursor: u64,
    batch_size: usize,
) -> Result<ScanBatch, ScanError> {
    let mut page = ScanBatch {
        next_cursor: cursor,
        ..Default::default()
    };

    for (index, entry) in WalkDir::new(root).sort_by_file_name().into_iter().enumerate() {
        let entry = entry.map_err(|e| ScanError::Failed(e.to_string()))?;
        if (index as u64) < cursor {
            continue;
        }
        page.next_cursor = index as u64 + 1;

        if entry.file_type().is_file() {
            let path = entry.path();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e.to_lowercase()));

            if ignore_files.contains(&name)
                || ext.as_ref().is_some_and(|e| ignore_exts.contains(e))
            {
                page.skipped += 1;
            } else if ext.as_ref().is_some_and(|e| text_exts.contains(e)) {
                page.scanned += 1;
                match std::fs::read_to_string(path) {
                    Ok(content) => page
                        .batch
                        .push((path.to_string_lossy().to_string(), content)),
                    Err(e) => {
                        debug!("unreadable text file {}: {e}", path.display());
                        page.skipped += 1;
                    }
                }
            } else {
                page.skipped += 1;
            }
        }

        if page.batch.len() >= batch_size {
            return Ok(page);
        }
    }

    page.done = true;
    Ok(page)
}
