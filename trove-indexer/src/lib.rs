//! Phased content indexing for the trove content store.
//!
//! Discovers text, video, and image files under a root path, converts
//! them into searchable records with embeddings, and tracks each job's
//! progress in memory. The heavy lifting lives in three places:
//!
//! - [`orchestrator::Orchestrator`] sequences the three phases per job
//! - [`scan::BatchScanner`] pages through the directory walk
//! - [`job::JobTracker`] answers status queries while a job runs
//!
//! Segmentation, transcription, and captioning are external services
//! consumed through the capability traits in [`media`].

pub mod classify;
pub mod dedup;
pub mod indexer;
pub mod job;
pub mod media;
pub mod orchestrator;
pub mod scan;

pub use classify::{Category, ClassificationTable, IgnorePolicy};
pub use job::{JobPhase, JobRecord, JobStatus, JobTracker};
pub use orchestrator::{IndexerConfig, Orchestrator, DEFAULT_BATCH_SIZE};
pub use scan::{BatchScanner, ScanService, WalkScanner};
