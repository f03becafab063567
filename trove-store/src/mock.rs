//! In-memory mock store for testing the indexing and search layers.
//!
//! Records every call, keeps file/video records keyed by content hash so
//! dedup behaves like the real backend, and supports canned responses and
//! injected failures per operation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::client::ContentStore;
use crate::error::{Result, StoreError};

#[derive(Default)]
struct MockState {
    files_by_hash: HashMap<String, Value>,
    videos_by_hash: HashMap<String, Value>,
    responses: HashMap<String, Value>,
    failures: HashSet<String>,
    calls: Vec<(String, Value)>,
}

/// A `ContentStore` backed by in-process maps.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<MockState>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a canned response whenever `operation` is queried.
    pub fn with_response(self, operation: &str, response: Value) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(operation.to_string(), response);
        self
    }

    /// Make every call to `operation` fail with a backend error.
    pub fn fail_operation(&self, operation: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation.to_string());
    }

    /// Seed a video record so `GetVideoByHash` reports it as existing.
    pub fn insert_video(&self, content_hash: &str, record: Value) {
        self.state
            .lock()
            .unwrap()
            .videos_by_hash
            .insert(content_hash.to_string(), record);
    }

    /// Every `(operation, params)` pair seen so far, in call order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// How many times `operation` was called.
    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(op, _)| op == operation)
            .count()
    }

    /// Number of distinct file records stored.
    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files_by_hash.len()
    }
}

#[async_trait]
impl ContentStore for MockStore {
    async fn query(&self, operation: &str, params: Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((operation.to_string(), params.clone()));

        if state.failures.contains(operation) {
            return Err(StoreError::backend(operation, 500, "injected failure"));
        }

        if let Some(response) = state.responses.get(operation) {
            return Ok(response.clone());
        }

        match operation {
            "CreateFile" | "CreateImage" => {
                let hash = params["content_hash"].as_str().unwrap_or_default().to_string();
                state.files_by_hash.insert(hash, params);
                Ok(json!({ "success": true }))
            }
            "CreateVideo" => {
                if let Some(hash) = params["content_hash"].as_str() {
                    state.videos_by_hash.insert(hash.to_string(), params.clone());
                }
                Ok(json!({ "success": true }))
            }
            "GetFileByHash" => {
                let hash = params["content_hash"].as_str().unwrap_or_default();
                let found: Vec<Value> = state.files_by_hash.get(hash).cloned().into_iter().collect();
                Ok(json!({ "file": found }))
            }
            "GetVideoByHash" => {
                let hash = params["content_hash"].as_str().unwrap_or_default();
                let found: Vec<Value> = state.videos_by_hash.get(hash).cloned().into_iter().collect();
                Ok(json!({ "video": found }))
            }
            _ => Ok(json!({ "success": true })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[tokio::test]
    async fn create_then_lookup_round_trips() -> anyhow::Result<()> {
        let store = MockStore::new();
        ops::create_file(&store, "f1", "hash-1", "contents", "/tmp/a.txt").await?;

        let found = ops::get_file_by_hash(&store, "hash-1").await?;
        assert_eq!(found.unwrap()["file_id"], "f1");
        assert!(ops::get_file_by_hash(&store, "hash-2").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_backend_error() {
        let store = MockStore::new();
        store.fail_operation("CreateFile");
        let err = ops::create_file(&store, "f1", "h", "c", "p").await.unwrap_err();
        assert!(err.to_string().contains("CreateFile"));
    }
}
