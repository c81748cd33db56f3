//! Error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Failures of the persistent store adapter.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The persisted payload could not be parsed.
    #[error("corrupt wishlist payload under {key:?}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize wishlist: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Failures talking to the remote wishlist API.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("failed to build http client: {0}")]
    ClientBuild(String),
}

impl RemoteError {
    /// Whether the failure came from the server rather than the transport.
    pub fn is_server(&self) -> bool {
        matches!(self, RemoteError::Server { .. })
    }
}

/// Top-level error for building and running a wishlist store.
#[derive(Debug, Error)]
pub enum WishlistError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("remote sync needs a tokio runtime, but none is running")]
    NoRuntime,
}
