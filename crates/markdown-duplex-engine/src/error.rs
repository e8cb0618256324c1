/// Caller-visible failures of the synchronization engine.
///
/// Everything else (unresolvable patches, stale selections, no-op edits)
/// degrades locally and never surfaces as an error.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("HTML contains no convertible content: {0}")]
    UnsupportedHtml(String),
}
