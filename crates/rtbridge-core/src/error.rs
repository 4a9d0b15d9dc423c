//! Error types shared by adapters and backends.

/// Errors raised by a remote backend handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Index lies outside the text
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested UTF-16 index
        index: usize,
        /// Current UTF-16 length
        len: usize,
    },
    /// Range is reversed or splits a character
    #[error("invalid range [{start}, {end})")]
    InvalidRange {
        /// Range start
        start: usize,
        /// Range end
        end: usize,
    },
    /// The session backing this handle is no longer connected
    #[error("session disconnected")]
    Disconnected,
    /// Any other backend failure
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the bridge adapters.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Arguments were rejected before reaching the backend
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
    /// The adapter has already been disposed
    #[error("adapter used after dispose")]
    UseAfterDispose,
    /// The remote handle rejected the operation
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// A stored map value is not a valid record
    #[error("failed to decode value for key '{key}': {source}")]
    Decode {
        /// Key whose value failed to decode
        key: String,
        /// Underlying JSON error
        source: serde_json::Error,
    },
    /// A record could not be encoded for storage
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
}
