//! Errors produced by the live source graph.

/// Errors that can occur while routing media through the live source graph.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// Another publisher is already active for this stream key.
    #[error("stream busy: {0}")]
    StreamBusy(String),
    /// No live source exists for the requested stream key.
    #[error("stream not found: {0}")]
    StreamNotFound(String),
    /// The source is tearing down; the caller should retry against a fresh source.
    #[error("stream disposing: {0}")]
    Disposing(String),
}
