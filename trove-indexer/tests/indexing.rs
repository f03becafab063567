//! End-to-end indexing jobs against the in-memory mock store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use trove_indexer::indexer::image::CaptionImagePipeline;
use trove_indexer::indexer::video::SegmentingVideoPipeline;
use trove_indexer::media::{MockCaptioner, MockSegmenter, MockTranscriber};
use trove_indexer::{
    Category, ClassificationTable, IgnorePolicy, JobRecord, JobStatus, JobTracker, Orchestrator,
    WalkScanner,
};
use trove_store::MockStore;

fn classification() -> Arc<ClassificationTable> {
    let mut document = HashMap::new();
    document.insert("text".to_string(), vec![".txt".to_string(), ".md".to_string()]);
    document.insert("video".to_string(), vec![".mp4".to_string()]);
    document.insert("image".to_string(), vec![".png".to_string()]);
    Arc::new(ClassificationTable::from_document(document))
}

fn ignore_policy(dir: &Path) -> Arc<IgnorePolicy> {
    let path = dir.join("ignore.json");
    std::fs::write(&path, r#"{"ignore_extensions": [".pyc"], "ignore_files": []}"#).unwrap();
    Arc::new(IgnorePolicy::load(&path))
}

fn orchestrator(store: Arc<MockStore>, tracker: JobTracker, ignore: Arc<IgnorePolicy>) -> Orchestrator {
    Orchestrator::new(
        store.clone(),
        tracker,
        Arc::new(WalkScanner::new()),
        Arc::new(SegmentingVideoPipeline::new(
            store.clone(),
            Arc::new(MockSegmenter::default()),
            Arc::new(MockTranscriber),
            Arc::new(MockCaptioner),
        )),
        Arc::new(CaptionImagePipeline::new(store, Arc::new(MockCaptioner))),
        classification(),
        ignore,
        10,
    )
}

async fn wait_for_terminal(tracker: &JobTracker, job_id: &str) -> JobRecord {
    for _ in 0..200 {
        if let Some(record) = tracker.get(job_id) {
            if record.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}

#[tokio::test]
async fn mixed_directory_indexes_every_modality() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "plain text notes").unwrap();
    std::fs::write(dir.path().join("b.mp4"), "video bytes").unwrap();
    std::fs::write(dir.path().join("c.png"), "png bytes").unwrap();
    std::fs::write(dir.path().join("d.pyc"), "compiled junk").unwrap();

    let store = Arc::new(MockStore::new());
    let tracker = JobTracker::new();
    let config_dir = tempdir().unwrap();
    let orchestrator = orchestrator(store.clone(), tracker.clone(), ignore_policy(config_dir.path()));

    let job_id = orchestrator.start_job(dir.path()).unwrap();
    let record = wait_for_terminal(&tracker, &job_id).await;

    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.text.found, 1);
    assert_eq!(record.text.indexed, 1);
    assert_eq!(record.text.errors, 0);
    assert_eq!(record.video.found, 1);
    assert_eq!(record.video.indexed, 1);
    assert_eq!(record.image.found, 1);
    assert_eq!(record.image.indexed, 1);

    // The ignored .pyc never reached any store write.
    assert!(store
        .calls()
        .iter()
        .all(|(_, params)| !params.to_string().contains("d.pyc")));
    assert_eq!(store.call_count("CreateFile"), 1);
    assert_eq!(store.call_count("CreateVideo"), 1);
    assert_eq!(store.call_count("CreateImage"), 1);
}

#[tokio::test]
async fn duplicate_directory_job_is_rejected_while_running() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "text").unwrap();

    let store = Arc::new(MockStore::new());
    let tracker = JobTracker::new();
    let config_dir = tempdir().unwrap();
    let orchestrator = orchestrator(store, tracker.clone(), ignore_policy(config_dir.path()));

    let job_id = orchestrator.start_job(dir.path()).unwrap();
    // The first job was just created as running, so the second is refused.
    assert!(orchestrator.start_job(dir.path()).is_err());

    let record = wait_for_terminal(&tracker, &job_id).await;
    assert_eq!(record.status, JobStatus::Completed);

    // Once terminal, the same directory can be indexed again.
    assert!(orchestrator.start_job(dir.path()).is_ok());
}

#[tokio::test]
async fn failing_store_marks_items_as_errors_not_the_job() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    std::fs::write(dir.path().join("b.txt"), "bravo").unwrap();

    let store = Arc::new(MockStore::new());
    store.fail_operation("CreateFile");
    let tracker = JobTracker::new();
    let config_dir = tempdir().unwrap();
    let orchestrator = orchestrator(store, tracker.clone(), ignore_policy(config_dir.path()));

    let job_id = orchestrator.start_job(dir.path()).unwrap();
    let record = wait_for_terminal(&tracker, &job_id).await;

    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.text.found, 2);
    assert_eq!(record.text.errors, 2);
    assert_eq!(record.text.indexed, 0);
}

#[tokio::test]
async fn missing_root_fails_the_job() {
    let store = Arc::new(MockStore::new());
    let tracker = JobTracker::new();
    let config_dir = tempdir().unwrap();
    let orchestrator = orchestrator(store, tracker.clone(), ignore_policy(config_dir.path()));

    let job_id = orchestrator
        .start_job(Path::new("/definitely/not/a/real/root"))
        .unwrap();
    let record = wait_for_terminal(&tracker, &job_id).await;

    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.text.errors, 1);
    assert!(record.message.is_some());
}

#[tokio::test]
async fn rerunning_a_directory_skips_already_indexed_content() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "stable content").unwrap();

    let store = Arc::new(MockStore::new());
    let tracker = JobTracker::new();
    let config_dir = tempdir().unwrap();
    let orchestrator = orchestrator(store.clone(), tracker.clone(), ignore_policy(config_dir.path()));

    let first = orchestrator.start_job(dir.path()).unwrap();
    wait_for_terminal(&tracker, &first).await;
    let second = orchestrator.start_job(dir.path()).unwrap();
    let record = wait_for_terminal(&tracker, &second).await;

    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.text.found, 1);
    assert_eq!(record.text.indexed, 0);
    assert_eq!(record.text.skipped, 1);
    assert_eq!(store.call_count("CreateFile"), 1);
}

#[test]
fn category_lookup_drives_phase_extensions() {
    let table = classification();
    assert_eq!(table.extensions_for(Category::Text), vec![".md", ".txt"]);
    assert_eq!(table.classify(".MP4"), Some(Category::Video));
}
