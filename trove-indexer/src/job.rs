//! In-memory job-status tracking.
//!
//! One [`JobTracker`] is constructed at process start and shared by
//! reference wherever job visibility is needed. All state lives behind a
//! single mutex; records survive for the life of the process and are
//! never deleted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::indexer::PhaseCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    ScanText,
    ScanVideo,
    ScanImage,
    Done,
}

/// Lifecycle and counters for one indexing invocation.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job_id: String,
    pub directory: String,
    pub status: JobStatus,
    pub phase: JobPhase,
    pub batch_size: usize,
    pub text: PhaseCounts,
    pub video: PhaseCounts,
    pub image: PhaseCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Thread-safe keyed store of job records.
#[derive(Default, Clone)]
pub struct JobTracker {
    jobs: Arc<Mutex<HashMap<String, JobRecord>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running job.
    pub fn create(&self, job_id: &str, directory: &str, batch_size: usize) -> JobRecord {
        let now = Utc::now();
        let record = JobRecord {
            job_id: job_id.to_string(),
            directory: directory.to_string(),
            status: JobStatus::Running,
            phase: JobPhase::ScanText,
            batch_size,
            text: PhaseCounts::default(),
            video: PhaseCounts::default(),
            image: PhaseCounts::default(),
            message: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        };
        self.jobs
            .lock()
            .expect("job tracker lock poisoned")
            .insert(job_id.to_string(), record.clone());
        record
    }

    /// Apply a mutation atomically and stamp `updated_at`. Unknown job ids
    /// are a no-op returning `None`; no record is created.
    pub fn update(
        &self,
        job_id: &str,
        mutate: impl FnOnce(&mut JobRecord),
    ) -> Option<JobRecord> {
        let mut jobs = self.jobs.lock().expect("job tracker lock poisoned");
        let record = jobs.get_mut(job_id)?;
        mutate(record);
        record.updated_at = Utc::now();
        Some(record.clone())
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs
            .lock()
            .expect("job tracker lock poisoned")
            .get(job_id)
            .cloned()
    }

    /// Mark a job completed and stamp its finish time.
    pub fn finish(&self, job_id: &str, message: Option<String>) -> Option<JobRecord> {
        self.update(job_id, |record| {
            record.status = JobStatus::Completed;
            record.phase = JobPhase::Done;
            record.message = message;
            record.finished_at = Some(Utc::now());
        })
    }

    /// Mark a job failed with an error message.
    pub fn fail(&self, job_id: &str, error: impl Into<String>) -> Option<JobRecord> {
        let error = error.into();
        self.update(job_id, |record| {
            record.status = JobStatus::Failed;
            record.phase = JobPhase::Done;
            record.message = Some(error);
            record.finished_at = Some(Utc::now());
        })
    }

    /// Is there a running job for this directory already?
    pub fn has_running_job_for(&self, directory: &str) -> bool {
        self.jobs
            .lock()
            .expect("job tracker lock poisoned")
            .values()
            .any(|record| record.directory == directory && record.status == JobStatus::Running)
    }

    /// Snapshot of every job, newest first.
    pub fn jobs(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self
            .jobs
            .lock()
            .expect("job tracker lock poisoned")
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}
