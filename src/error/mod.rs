//! Error taxonomy shared by every component.
//!
//! Cancellation and deadline errors are kept apart from everything else so
//! callers can branch on them with [`SdkError::is_cancellation`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SdkError>;

#[derive(Error, Debug)]
pub enum SdkError {
    /// The context was cancelled before or during the operation.
    #[error("context canceled")]
    Canceled,

    /// The context deadline passed before the operation completed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Cache miss: the key is absent or its entry expired.
    #[error("key not found: {0}")]
    NotFound(String),

    /// Cache backend failure other than a miss.
    #[error("cache error: {0}")]
    Cache(String),

    /// `do_request` was called without a payload.
    #[error("payload cannot be nil")]
    InvalidPayload,

    /// Method or URL could not be turned into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Token fetcher failure, surfaced to the caller unchanged.
    #[error("token fetch failed: {0:#}")]
    Fetch(anyhow::Error),

    /// Transport, multipart encoding or body read failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Remote API reported a non-zero error code.
    #[error(transparent)]
    Api(#[from] crate::tools::error::CommonError),
}

impl SdkError {
    /// True for [`SdkError::Canceled`] and [`SdkError::DeadlineExceeded`].
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn fetch(err: impl Into<anyhow::Error>) -> Self {
        Self::Fetch(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_distinguishable() {
        assert!(SdkError::Canceled.is_cancellation());
        assert!(SdkError::DeadlineExceeded.is_cancellation());
        assert!(!SdkError::NotFound("k".into()).is_cancellation());
        assert!(!SdkError::InvalidPayload.is_cancellation());
    }

    #[test]
    fn fetch_error_keeps_upstream_message() {
        let err = SdkError::fetch(anyhow::anyhow!("upstream returned 503"));
        assert_eq!(err.to_string(), "token fetch failed: upstream returned 503");
    }
}
