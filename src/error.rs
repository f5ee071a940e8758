//! Error kinds shared by every layer of the core.

use thiserror::Error;

/// The error kinds the core ever produces.
///
/// Kinds, not exception hierarchies: every fallible operation in this crate
/// resolves to exactly one of these, which is also the taxonomy the
/// observability layer (`crate::metrics`) counts by.
#[derive(Debug, Error)]
pub enum RedisError {
    /// A caller-provided parameter violated a documented precondition.
    /// Raised synchronously, before any I/O.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// The channel, pool, or router has no usable node.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The response did not arrive within the allotted time. Not retried
    /// automatically, and does not by itself close the channel.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The server replied with a RESP `-...` Error frame.
    #[error("redis server error: {0}")]
    RedisServerError(String),

    /// Any other failure: decode, serialization, transcoder magic mismatch,
    /// or I/O read/write failure not otherwise classified.
    #[error("unexpected error: {0}")]
    UnexpectedError(String),
}

impl RedisError {
    /// The label used to key the per-kind error counter in `crate::metrics`.
    ///
    /// A missing key is not an error: it's a logical "absent" result
    /// surfaced to callers as `None`, so there is no `KeyNotFound` variant
    /// here. Counting it is the caller's job at the
    /// point it turns a `None` into an absence (see `crate::metrics::record_key_not_found`).
    pub fn metric_label(&self) -> &'static str {
        match self {
            RedisError::IllegalArgument(_) => "invalid-argument",
            RedisError::IllegalState(_) => "illegal-state",
            RedisError::Timeout(_) => "timeout",
            RedisError::RedisServerError(_) => "redis-error",
            RedisError::UnexpectedError(_) => "unexpected-error",
        }
    }
}

impl From<std::io::Error> for RedisError {
    fn from(e: std::io::Error) -> Self {
        RedisError::UnexpectedError(e.to_string())
    }
}

pub type RedisResult<T> = Result<T, RedisError>;
