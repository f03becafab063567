//! The `ContentStore` trait and its HTTP implementation.
//!
//! Every interaction with the graph content store goes through a named
//! operation (`CreateFile`, `GetFileByHash`, `SearchFileEmbeddings`, ...)
//! taking a flat JSON parameter mapping and returning backend-shaped JSON.
//! The shape of the response is owned by the backend; callers that need
//! structure go through the helpers in [`crate::ops`] or normalize the
//! value themselves.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoreError};

/// A graph content store addressed by named operations.
///
/// Implementations must be cheap to share behind an `Arc`; the indexer
/// fans out one store call per file in a batch.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Execute the named operation with the given flat parameter mapping.
    ///
    /// Returns the raw JSON response. Errors are transport or backend
    /// failures only; an empty or oddly-shaped response is not an error
    /// at this layer.
    async fn query(&self, operation: &str, params: Value) -> Result<Value>;
}

/// Connection settings for [`HttpStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the store, e.g. `http://127.0.0.1:7003`
    pub base_url: String,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7003".to_string(),
        }
    }
}

/// HTTP client for the graph content store.
///
/// Operations are POSTed as `{base_url}/{operation}` with the parameter
/// mapping as the JSON body. One shared reqwest client handles connection
/// pooling.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl HttpStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), operation)
    }
}

#[async_trait]
impl ContentStore for HttpStore {
    async fn query(&self, operation: &str, params: Value) -> Result<Value> {
        debug!("store operation {operation}");
        let response = self
            .client
            .post(self.endpoint(operation))
            .json(&params)
            .send()
            .await
            .map_err(|e| StoreError::transport(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::transport(operation, e))?;

        if !status.is_success() {
            return Err(StoreError::backend(operation, status.as_u16(), body));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|source| StoreError::InvalidJson {
            operation: operation.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let store = HttpStore::new(StoreConfig::new("http://localhost:7003/"));
        assert_eq!(store.endpoint("CreateFile"), "http://localhost:7003/CreateFile");
    }
}
