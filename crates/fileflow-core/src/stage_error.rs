//! Stage execution error types
//!
//! A stage handler can fail in two ways: a permanent rejection (malformed
//! event, missing required fields) that must be acknowledged and dropped so
//! the transport never redelivers it, or a transient failure (store or
//! storage call failed) that must be retried. `StageError` carries that
//! distinction so the consumer and the push transport can route the outcome.

use std::fmt;

/// Stage execution error that is either retryable or a permanent rejection.
#[derive(Debug)]
pub struct StageError {
    inner: anyhow::Error,
    retryable: bool,
}

impl StageError {
    /// Permanent rejection: acknowledge and drop, never retry.
    ///
    /// Use for malformed payloads, missing job/bucket/path fields, and
    /// anything else that cannot change on redelivery.
    pub fn permanent(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            retryable: false,
        }
    }

    /// Transient failure: do not acknowledge, rely on redelivery.
    ///
    /// Use for store, storage, and channel call failures.
    pub fn transient(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            retryable: true,
        }
    }

    /// Whether the message should be redelivered.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Get the inner error
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    /// Consume self and return the inner error
    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for StageError {
    /// Default conversion from anyhow::Error creates a transient error.
    fn from(err: anyhow::Error) -> Self {
        Self::transient(err)
    }
}

/// Extension trait for Result to mark errors as permanent rejections.
pub trait StageResultExt<T> {
    /// Mark this result as a permanent rejection on error.
    fn permanent(self) -> Result<T, StageError>;
}

impl<T, E: Into<anyhow::Error>> StageResultExt<T> for Result<T, E> {
    fn permanent(self) -> Result<T, StageError> {
        self.map_err(|e| StageError::permanent(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_error() {
        let err = StageError::permanent(anyhow::anyhow!("missing job_id"));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("missing job_id"));
    }

    #[test]
    fn test_transient_error() {
        let err = StageError::transient(anyhow::anyhow!("connection refused"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_anyhow() {
        let err: StageError = anyhow::anyhow!("some error").into();
        assert!(err.is_retryable(), "Default should be retryable");
    }

    #[test]
    fn test_result_ext() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("undecodable payload"));
        let stage_result = result.permanent();
        assert!(!stage_result.unwrap_err().is_retryable());
    }
}
