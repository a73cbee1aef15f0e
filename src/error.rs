use thiserror::Error;

/// The body could not be turned into a value tree.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed payload: body has {len} chars, expected more than the {skip}-char prefix")]
    Truncated { len: usize, skip: usize },

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Page-level failures surfaced by the fetch collaborators and the pager.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream redirected to its block page. Not retryable within a run.
    #[error("blocked by upstream (redirected to {0})")]
    BlockedByUpstream(String),

    #[error(transparent)]
    MalformedPayload(#[from] PayloadError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),
}

impl FetchError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, FetchError::BlockedByUpstream(_))
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder returned status {0}")]
    Status(u16),

    #[error("geocoder attempt timed out")]
    Timeout,
}

/// One entry did not have the shape its layout promises. Counted by the
/// extractors, never propagated past the page.
#[derive(Debug, Error)]
#[error("record skipped: {0}")]
pub struct RecordSkipped(String);

impl RecordSkipped {
    pub fn new(reason: impl Into<String>) -> Self {
        RecordSkipped(reason.into())
    }
}
