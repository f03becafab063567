//! Job orchestration: sequences the text, video, and image phases and
//! drives the job tracker.
//!
//! A started job runs detached; the caller gets a job id back immediately
//! and polls the tracker for progress. Per-item failures are folded into
//! counters, and only a scan-service failure fails the job outright.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

use trove_store::ContentStore;

use crate::classify::{collect_files_by_extension, Category, ClassificationTable, IgnorePolicy};
use crate::indexer::image::ImagePipeline;
use crate::indexer::text::TextIndexer;
use crate::indexer::video::VideoPipeline;
use crate::job::{JobPhase, JobTracker};
use crate::scan::{BatchScanner, ScanService};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Where the configuration documents live and how big text batches are.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub file_types_path: PathBuf,
    pub ignore_path: PathBuf,
    pub batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            file_types_path: PathBuf::from("config/file_types.json"),
            ignore_path: PathBuf::from("config/ignore.json"),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl IndexerConfig {
    pub fn with_file_types_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_types_path = path.into();
        self
    }

    pub fn with_ignore_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_path = path.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Load both documents, fail-open.
    pub fn load_documents(&self) -> (ClassificationTable, IgnorePolicy) {
        (
            ClassificationTable::load(&self.file_types_path),
            IgnorePolicy::load(&self.ignore_path),
        )
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn ContentStore>,
    tracker: JobTracker,
    scan_service: Arc<dyn ScanService>,
    video_pipeline: Arc<dyn VideoPipeline>,
    image_pipeline: Arc<dyn ImagePipeline>,
    classification: Arc<ClassificationTable>,
    ignore: Arc<IgnorePolicy>,
    batch_size: usize,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ContentStore>,
        tracker: JobTracker,
        scan_service: Arc<dyn ScanService>,
        video_pipeline: Arc<dyn VideoPipeline>,
        image_pipeline: Arc<dyn ImagePipeline>,
        classification: Arc<ClassificationTable>,
        ignore: Arc<IgnorePolicy>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            tracker,
            scan_service,
            video_pipeline,
            image_pipeline,
            classification,
            ignore,
            batch_size: batch_size.max(1),
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Current state of a job, or `None` if the id is unknown.
    pub fn job_status(&self, job_id: &str) -> Option<crate::job::JobRecord> {
        self.tracker.get(job_id)
    }

    /// Start an indexing job for `directory` and return its id without
    /// waiting for completion. A second job for the same directory while
    /// one is still running is rejected.
    pub fn start_job(&self, directory: &Path) -> Result<String> {
        let dir = directory.to_string_lossy().to_string();
        if self.tracker.has_running_job_for(&dir) {
            bail!("an indexing job for {dir} is already running");
        }

        let job_id = Uuid::new_v4().to_string();
        self.tracker.create(&job_id, &dir, self.batch_size);
        info!("job {job_id}: indexing {dir}");

        let orchestrator = self.clone();
        let supervisor_id = job_id.clone();
        let root = directory.to_path_buf();
        tokio::spawn(async move {
            orchestrator.supervise(supervisor_id, root).await;
        });

        Ok(job_id)
    }

    /// Run the job on its own task and fold any escape, error or panic,
    /// into a terminal `failed` status.
    async fn supervise(self, job_id: String, root: PathBuf) {
        let worker = {
            let orchestrator = self.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move { orchestrator.run_job(&job_id, &root).await })
        };

        match worker.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("job {job_id} failed: {e:#}");
                self.tracker.fail(&job_id, e.to_string());
            }
            Err(e) => {
                error!("job {job_id} task panicked: {e}");
                self.tracker.fail(&job_id, format!("internal task failure: {e}"));
            }
        }
    }

    async fn run_job(&self, job_id: &str, root: &Path) -> Result<()> {
        self.run_text_phase(job_id, root).await?;

        self.tracker.update(job_id, |r| r.phase = JobPhase::ScanVideo);
        self.run_video_phase(job_id, root).await;

        self.tracker.update(job_id, |r| r.phase = JobPhase::ScanImage);
        self.run_image_phase(job_id, root).await;

        self.tracker.finish(job_id, Some("indexing complete".to_string()));
        info!("job {job_id}: complete");
        Ok(())
    }

    /// Batched, concurrent-within-batch text indexing. Only a scan failure
    /// ends the phase early; everything else is contained per item.
    async fn run_text_phase(&self, job_id: &str, root: &Path) -> Result<()> {
        let text_exts = self.classification.extensions_for(Category::Text);
        if text_exts.is_empty() {
            warn!("job {job_id}: no text extensions configured, skipping text phase");
            return Ok(());
        }

        let ignore_exts = self.ignore.extensions();
        let ignore_files = self.ignore.file_names();
        let mut scanner = BatchScanner::new(self.scan_service.clone());
        let indexer = TextIndexer::new(self.store.clone());
        let mut cursor = 0;

        loop {
            let page = match scanner
                .next_batch(root, &text_exts, &ignore_exts, &ignore_files, cursor, self.batch_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    self.tracker.update(job_id, |r| r.text.errors += 1);
                    return Err(anyhow!("text scan of {} failed: {e}", root.display()));
                }
            };
            cursor = page.next_cursor;

            self.tracker.update(job_id, |r| {
                r.text.found += page.scanned as u64;
                r.text.skipped += page.skipped as u64;
            });

            if !page.batch.is_empty() {
                let outcomes = indexer.index_batch(page.batch).await;
                self.tracker.update(job_id, |r| {
                    for outcome in &outcomes {
                        r.text.absorb(outcome);
                    }
                });
            }

            if page.done {
                return Ok(());
            }
        }
    }

    /// Sequential per-video indexing to bound segmentation load.
    async fn run_video_phase(&self, job_id: &str, root: &Path) {
        let Some(paths) = self.collect_phase_paths(job_id, root, Category::Video).await else {
            return;
        };

        self.tracker
            .update(job_id, |r| r.video.found += paths.len() as u64);

        for path in paths {
            let outcome = self.video_pipeline.index_video(&path).await;
            self.tracker.update(job_id, |r| r.video.absorb(&outcome));
        }
    }

    /// The whole image batch goes to the pipeline in one call.
    async fn run_image_phase(&self, job_id: &str, root: &Path) {
        let Some(paths) = self.collect_phase_paths(job_id, root, Category::Image).await else {
            return;
        };

        self.tracker
            .update(job_id, |r| r.image.found += paths.len() as u64);

        let outcomes = self.image_pipeline.index_images(paths).await;
        if outcomes.is_empty() {
            warn!("job {job_id}: image pipeline returned no outcomes for a non-empty batch");
            self.tracker.update(job_id, |r| r.image.errors += 1);
            return;
        }
        self.tracker.update(job_id, |r| {
            for outcome in &outcomes {
                r.image.absorb(outcome);
            }
        });
    }

    /// Walk `root` for one category's files on the blocking pool. `None`
    /// means the phase has nothing to do.
    async fn collect_phase_paths(
        &self,
        job_id: &str,
        root: &Path,
        category: Category,
    ) -> Option<Vec<PathBuf>> {
        let extensions = self.classification.extensions_for(category);
        if extensions.is_empty() {
            return None;
        }

        let root = root.to_path_buf();
        let ignore = self.ignore.clone();
        let walked = tokio::task::spawn_blocking(move || {
            collect_files_by_extension(&root, &extensions, &ignore)
        })
        .await;

        match walked {
            Ok(paths) if paths.is_empty() => None,
            Ok(paths) => Some(paths),
            Err(e) => {
                warn!("job {job_id}: directory walk failed: {e}");
                None
            }
        }
    }
}
