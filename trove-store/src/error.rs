//! Error types for the content store client

/// Result type for store operations.
///
/// Convenience alias using [`StoreError`] as the error type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error type for all graph content-store operations.
///
/// Covers transport failures, backend-reported failures, and responses
/// whose shape the caller could not interpret. Integrates with [`thiserror`]
/// for automatic [`std::error::Error`] implementation and error chaining.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP transport failed before a response was produced
    #[error("transport error calling `{operation}`: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success HTTP status
    #[error("store operation `{operation}` failed with status {status}: {message}")]
    Backend {
        operation: String,
        status: u16,
        message: String,
    },

    /// The response body was not valid JSON
    #[error("store operation `{operation}` returned invalid JSON: {source}")]
    InvalidJson {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// Generic errors from other libraries
    #[error("external error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl StoreError {
    /// Wrap a transport-level failure for the given operation.
    pub fn transport(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            operation: operation.into(),
            source,
        }
    }

    /// Construct a backend-reported failure.
    pub fn backend(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }
}
