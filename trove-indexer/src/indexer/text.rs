//! Text file indexing: hash, dedup, write content plus embeddings.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use trove_store::{ops, ContentStore};

use crate::dedup::{hash_content, Deduplicator};
use crate::indexer::ItemOutcome;

/// Indexes one text file at a time; cheap to clone for task fan-out.
#[derive(Clone)]
pub struct TextIndexer {
    store: Arc<dyn ContentStore>,
}

impl TextIndexer {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Index one file's content. A dedup hit is a successful no-op; either
    /// store write failing leaves the item failed (a content record
    /// without embeddings may remain, accepted without cleanup).
    pub async fn index_one(&self, path: &str, content: &str) -> ItemOutcome {
        let content_hash = hash_content(content);

        if Deduplicator::new(self.store.clone())
            .is_duplicate_file(&content_hash)
            .await
        {
            debug!("skipping {path}: content already indexed");
            return ItemOutcome::duplicate(path);
        }

        let file_id = Uuid::new_v4().to_string();
        if let Err(e) =
            ops::create_file(self.store.as_ref(), &file_id, &content_hash, content, path).await
        {
            warn!("failed to store {path}: {e}");
            return ItemOutcome::failed(path, e.to_string());
        }
        // Embeddings reference the content record, so order matters.
        if let Err(e) =
            ops::create_file_embeddings(self.store.as_ref(), &file_id, content, path).await
        {
            warn!("failed to store embeddings for {path}: {e}");
            return ItemOutcome::failed(path, e.to_string());
        }

        ItemOutcome::indexed(path, file_id)
    }

    /// Fan out one task per file and collect every outcome, in no
    /// particular order. A panicking task folds into a failed outcome for
    /// its file rather than aborting its siblings.
    pub async fn index_batch(&self, batch: Vec<(String, String)>) -> Vec<ItemOutcome> {
        let mut paths = Vec::with_capacity(batch.len());
        let mut handles = Vec::with_capacity(batch.len());
        for (path, content) in batch {
            let indexer = self.clone();
            let task_path = path.clone();
            paths.push(path);
            handles.push(tokio::spawn(async move {
                indexer.index_one(&task_path, &content).await
            }));
        }

        futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(paths)
            .map(|(result, path)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("indexing task for {path} panicked: {e}");
                    ItemOutcome::failed(path, format!("task failure: {e}"))
                }
            })
            .collect()
    }
}
