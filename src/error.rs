//! Error taxonomy for the enhancement client

use std::time::Duration;

use thiserror::Error;

/// Errors produced while driving an enhancement request.
///
/// `Cancelled` and `Configuration` are terminal and never retried;
/// `Network`, `RateLimited`, and `Timeout` are transient and consumed by the
/// orchestrator's retry loop before escalating as `Exhausted`.
#[derive(Debug, Error)]
pub enum EnhanceError {
    /// Invalid option or missing credential; surfaced immediately
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport failure or non-success HTTP status
    #[error("network error: {0}")]
    Network(String),

    /// HTTP 429 with an optional server-provided retry delay
    #[error("rate limited by remote API")]
    RateLimited { retry_after: Option<Duration> },

    /// Attempt exceeded its adaptive deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Caller triggered the cancellation token
    #[error("enhancement cancelled")]
    Cancelled,

    /// Every candidate exhausted its retry budget
    #[error("enhancement failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: usize,
        #[source]
        source: Box<EnhanceError>,
    },
}

impl EnhanceError {
    /// Whether the retry loop may attempt again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::Timeout(_)
        )
    }

    /// Whether this is a caller-initiated cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
