//! Command layer: strongly-typed command builders and response parsers over
//! the RESP codec, transcoder, and channel.
//!
//! Each family below is a thin façade holding only an `Arc<Executor>` — no
//! façade touches I/O directly; a single internal Executor does, instead of
//! a role-inheritance tree. A façade's job is always the same triple:
//! validate inputs, build command bytes, parse the response frame.

pub mod counter;
pub mod geo;
pub mod hash;
pub mod key;
pub mod list;
pub mod set;
pub mod string;
pub mod zset;

use bytes::Bytes;

use crate::error::{RedisError, RedisResult};
use crate::protocol::{encode_command, RedisData};

/// A key must be non-empty. `value`/`member` share the same rule wherever
/// a non-null argument is required.
pub(crate) fn validate_non_empty(name: &str, bytes: &[u8]) -> RedisResult<()> {
    if bytes.is_empty() {
        return Err(RedisError::IllegalArgument(format!("{name} must not be empty")));
    }
    Ok(())
}

pub(crate) fn validate_positive(name: &str, n: i64) -> RedisResult<()> {
    if n <= 0 {
        return Err(RedisError::IllegalArgument(format!("{name} must be > 0")));
    }
    Ok(())
}

pub(crate) fn validate_non_negative(name: &str, n: i64) -> RedisResult<()> {
    if n < 0 {
        return Err(RedisError::IllegalArgument(format!("{name} must be >= 0")));
    }
    Ok(())
}

/// Builds a RESP command from byte-slice-able arguments.
pub(crate) fn build<A: AsRef<[u8]>>(args: &[A]) -> Bytes {
    encode_command(args)
}

pub(crate) fn expect_integer(frame: RedisData) -> RedisResult<i64> {
    match frame {
        RedisData::Integer(n) => Ok(n),
        other => Err(unexpected("integer", &other)),
    }
}

pub(crate) fn expect_ok(frame: RedisData) -> RedisResult<()> {
    match frame {
        RedisData::SimpleString(_) => Ok(()),
        other => Err(unexpected("simple string", &other)),
    }
}

pub(crate) fn expect_simple_string(frame: RedisData) -> RedisResult<String> {
    match frame {
        RedisData::SimpleString(s) => Ok(s),
        other => Err(unexpected("simple string", &other)),
    }
}

pub(crate) fn expect_bulk(frame: RedisData) -> RedisResult<Option<Bytes>> {
    match frame {
        RedisData::BulkString(b) => Ok(b),
        other => Err(unexpected("bulk string", &other)),
    }
}

pub(crate) fn expect_array(frame: RedisData) -> RedisResult<Option<Vec<RedisData>>> {
    match frame {
        RedisData::Array(a) => Ok(a),
        other => Err(unexpected("array", &other)),
    }
}

/// A `SET ... NX`/`SET ... XX` style response: `OK` on success, nil bulk
/// when the condition was not satisfied.
pub(crate) fn expect_ok_or_nil(frame: RedisData) -> RedisResult<bool> {
    match frame {
        RedisData::SimpleString(_) => Ok(true),
        RedisData::BulkString(None) => Ok(false),
        other => Err(unexpected("simple string or nil", &other)),
    }
}

fn unexpected(wanted: &str, got: &RedisData) -> RedisError {
    RedisError::UnexpectedError(format!("expected {wanted} frame, got {got:?}"))
}

/// Parses a bulk string reply as a decimal integer (the "counter" family
/// treats GET's bulk-string reply as a number).
pub(crate) fn bulk_as_i64(bytes: &Bytes) -> RedisResult<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| RedisError::UnexpectedError("counter value is not an integer".into()))
}

pub(crate) fn bulk_as_f64(bytes: &Bytes) -> RedisResult<f64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| RedisError::UnexpectedError("value is not a float".into()))
}

pub(crate) fn bulk_as_utf8(bytes: Bytes) -> RedisResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| RedisError::UnexpectedError(format!("non-utf8 bulk string: {e}")))
}
