//! Execution, socket, compression, and cluster counters, emitted through
//! the `metrics` facade so the embedding application picks the exporter —
//! this module only records, it never exports.

use std::time::Duration;

/// Records one completed command execution.
pub fn record_execution(host: &str, method: &str, elapsed: Duration, error_kind: Option<&str>) {
    metrics::counter!("naiveredis_execution_total", "host" => host.to_string(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("naiveredis_execution_duration_seconds", "host" => host.to_string(), "method" => method.to_string())
        .record(elapsed.as_secs_f64());
    if let Some(kind) = error_kind {
        metrics::counter!("naiveredis_execution_errors_total", "host" => host.to_string(), "kind" => kind.to_string())
            .increment(1);
    }
}

/// Records a logical "absent" result for a get-style operation.
pub fn record_key_not_found(host: &str, method: &str) {
    metrics::counter!("naiveredis_execution_errors_total", "host" => host.to_string(), "kind" => "key-not-found", "method" => method.to_string())
        .increment(1);
}

/// Emits a slow-execution log + counter for a command whose elapsed time
/// exceeded `slowExecutionThreshold`.
pub fn record_slow_execution(host: &str, method: &str, elapsed: Duration, params: &str) {
    metrics::counter!("naiveredis_slow_execution_total", "host" => host.to_string(), "method" => method.to_string())
        .increment(1);
    tracing::warn!(
        host,
        method,
        elapsed_ns = elapsed.as_nanos() as u64,
        params,
        "slow redis command"
    );
}

pub fn record_socket_created(host: &str) {
    metrics::counter!("naiveredis_socket_created_total", "host" => host.to_string()).increment(1);
}

pub fn record_socket_closed(host: &str) {
    metrics::counter!("naiveredis_socket_closed_total", "host" => host.to_string()).increment(1);
}

pub fn record_heartbeat_failure(host: &str) {
    metrics::counter!("naiveredis_heartbeat_failures_total", "host" => host.to_string())
        .increment(1);
}

pub fn record_compression(host: &str, bytes_saved: i64) {
    metrics::histogram!("naiveredis_compression_bytes_saved", "host" => host.to_string())
        .record(bytes_saved as f64);
}

pub fn record_unavailable_client() {
    metrics::counter!("naiveredis_unavailable_client_total").increment(1);
}

pub fn record_multi_get_error() {
    metrics::counter!("naiveredis_multi_get_error_total").increment(1);
}
