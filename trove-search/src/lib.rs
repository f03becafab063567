//! # trove-search
//!
//! Search-result fusion for trove's multi-modal index. One query fans out to
//! three independent backends (file-content, combined video
//! transcript + frame, and image search) and their heterogeneous
//! responses are normalized, scored, and merged into a single ranked list.
//!
//! ## Scoring
//!
//! Within each modality, hits keep the backend's relevance order and get a
//! reciprocal-rank base score of `1 / (rank + 60)`, boosted by 1.2 when the
//! hit's content or path contains a query keyword. The merged list is
//! ordered by score with ties broken in favor of video hits, then
//! deduplicated by composite identity, first occurrence winning.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trove_search::SearchEngine;
//! use trove_store::{HttpStore, StoreConfig};
//!
//! # async fn example() {
//! let store = Arc::new(HttpStore::new(StoreConfig::default()));
//! let engine = SearchEngine::new(store);
//! let response = engine.search("founders dinner").await;
//! println!("{} results", response.results.len());
//! # }
//! ```

pub mod engine;
pub mod normalize;

pub use engine::{SearchEngine, SearchResponse, fuse};
pub use normalize::{Modality, SearchHit};
