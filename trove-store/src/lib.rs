//! # trove-store
//!
//! Client for the graph content store that backs trove's indexing and search.
//! The store is an external service addressed by named operations, and this
//! crate owns the transport, the operation vocabulary, and nothing else
//! (no schema, no local persistence).
//!
//! ## Modules
//!
//! - [`client`]: the [`ContentStore`] trait and the reqwest-backed [`HttpStore`]
//! - [`ops`]: typed wrappers for every operation the rest of trove issues
//! - [`mock`]: in-memory store for tests
//! - [`error`]: error types and result handling
//!
//! ## Quick start
//!
//! ```no_run
//! use trove_store::{HttpStore, StoreConfig, ops};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = HttpStore::new(StoreConfig::new("http://127.0.0.1:7003"));
//! let existing = ops::get_file_by_hash(&store, "deadbeef").await?;
//! println!("already indexed: {}", existing.is_some());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod mock;
pub mod ops;

pub use client::{ContentStore, HttpStore, StoreConfig};
pub use error::{Result, StoreError};
pub use mock::MockStore;
