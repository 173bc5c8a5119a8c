//! Sync error handling
//!
//! Every error the sync engine can hit is local to one connection or one
//! timer tick. Errors on the server side are folded into a wire response;
//! errors on the client side are logged and dropped.

use std::io;
use thiserror::Error;

/// Errors that can occur while serving or sending sync messages
#[derive(Error, Debug)]
pub enum SyncError {
    /// Empty, unparsable or oversized protocol line
    #[error("{0}")]
    Protocol(String),

    /// Shared secret mismatch
    #[error("Unauthorized")]
    Unauthorized,

    /// Unknown selection name, or PRIMARY while primary sync is disabled
    #[error("Unknown selection")]
    UnknownSelection,

    /// Message type other than `update` or `pull`
    #[error("Unsupported payload type: {0}")]
    UnsupportedType(String),

    /// A field required by the message type is absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Failed to reach or talk to the peer
    #[error("Network error talking to '{endpoint}': {source}")]
    Network {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Invalid listen port, malformed peer endpoint, ...
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The clipboard backend failed to read or write
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SyncError {
    /// Create a network error with endpoint context
    pub fn network(endpoint: impl Into<String>, source: io::Error) -> Self {
        SyncError::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Whether the error was caused by the remote side's request
    ///
    /// These are answered on the wire and are not worth more than a debug log.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            SyncError::Protocol(_)
                | SyncError::Unauthorized
                | SyncError::UnknownSelection
                | SyncError::UnsupportedType(_)
                | SyncError::MissingField(_)
        )
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(error: serde_json::Error) -> Self {
        SyncError::Protocol(format!("Invalid JSON: {}", error))
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
