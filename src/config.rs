//! Caller-visible options.

use std::time::Duration;

/// A single configured endpoint, `"host:port"`.
pub type Host = String;

/// Options that shape a [`crate::channel::Channel`] and everything built on
/// top of it. Plain fields with a `Default` — there is no file-based
/// configuration format here, so a config-loading crate would be overkill.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Per-command response timeout.
    pub timeout: Duration,
    /// Payload size above which the opaque transcoder compresses with LZF.
    pub compression_threshold: usize,
    /// Commands slower than this emit a slow-log record.
    pub slow_execution_threshold: Duration,
    /// Heartbeat interval. `None` disables the heartbeat.
    pub ping_period: Option<Duration>,
    /// Merge buffer / socket send buffer capacity.
    pub send_buffer_size: usize,
    /// Socket receive buffer capacity.
    pub receive_buffer_size: usize,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whether to enable TCP keep-alive on the socket.
    pub keep_alive: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            compression_threshold: 64 * 1024,
            slow_execution_threshold: Duration::from_millis(50),
            ping_period: Some(Duration::from_secs(30)),
            send_buffer_size: 64 * 1024,
            receive_buffer_size: 64 * 1024,
            connect_timeout: Duration::from_millis(5000),
            keep_alive: true,
        }
    }
}

impl ClientConfig {
    /// Validates the user-tunable fields that carry a positivity
    /// precondition (`timeout`, `compressionThreshold`,
    /// `slowExecutionThreshold` all `> 0`).
    pub fn validate(&self) -> Result<(), crate::error::RedisError> {
        use crate::error::RedisError;
        if self.timeout.is_zero() {
            return Err(RedisError::IllegalArgument("timeout must be > 0".into()));
        }
        if self.compression_threshold == 0 {
            return Err(RedisError::IllegalArgument(
                "compressionThreshold must be > 0".into(),
            ));
        }
        if self.slow_execution_threshold.is_zero() {
            return Err(RedisError::IllegalArgument(
                "slowExecutionThreshold must be > 0".into(),
            ));
        }
        Ok(())
    }
}
