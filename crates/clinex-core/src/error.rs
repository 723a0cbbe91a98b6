//! Error taxonomy for the extraction pipeline.
//!
//! Geometric extraction, validation, and classification never produce errors:
//! absence of structure, a rejected candidate, or a low-confidence category
//! all degrade the result without failing the pipeline. Errors exist only at
//! the reviewer boundary, captured per reviewer call.

use thiserror::Error;

/// Failure modes of a single reviewer call.
///
/// Transport-level variants ([`Transport`](AgentError::Transport),
/// [`RateLimited`](AgentError::RateLimited)) are distinct from content-level
/// ones ([`MalformedResponse`](AgentError::MalformedResponse)) so that only
/// the former trigger the injected retry policy. None of these ever abort
/// the batch for the other reviewers.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The call exceeded the bounded per-call timeout.
    #[error("agent call timed out after {0} ms")]
    Timeout(u64),

    /// The response arrived but did not conform to the reply schema.
    #[error("malformed agent response: {0}")]
    MalformedResponse(String),

    /// Network or HTTP failure reaching the inference service, including
    /// rate-limit retries that exhausted in the injected wrapper.
    #[error("inference transport error: {0}")]
    Transport(String),

    /// The inference service signalled throughput exhaustion (HTTP 429).
    /// Handled by the injected backoff wrapper, never by core call logic.
    #[error("inference service rate limit exceeded")]
    RateLimited,
}

impl AgentError {
    /// True for failures the injected retry policy may attempt again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transport(_))
    }
}

/// Result alias for reviewer-boundary operations.
pub type AgentCallResult<T> = std::result::Result<T, AgentError>;
