//! Key family: EXPIRE, DEL, EXISTS, TYPE, TTL, and PING.

use std::sync::Arc;

use super::{build, expect_integer, expect_simple_string, validate_non_empty, validate_positive};
use crate::error::RedisResult;
use crate::executor::{CommandKind, Executor};

pub struct KeyCommands {
    executor: Arc<Executor>,
}

impl KeyCommands {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    /// `EXPIRE key seconds`. Returns `true` iff the timeout was set (the key
    /// existed).
    pub async fn expire(&self, key: &[u8], seconds: i64) -> RedisResult<bool> {
        validate_non_empty("key", key)?;
        validate_positive("seconds", seconds)?;
        let payload = build(&[b"EXPIRE".to_vec(), key.to_vec(), seconds.to_string().into_bytes()]);
        let frame = self
            .executor
            .execute("expire", key, CommandKind::Write, payload)
            .await?;
        Ok(expect_integer(frame)? == 1)
    }

    /// `DEL key`. Returns `true` iff the key existed and was removed.
    pub async fn del(&self, key: &[u8]) -> RedisResult<bool> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"DEL".to_vec(), key.to_vec()]);
        let frame = self
            .executor
            .execute("del", key, CommandKind::Write, payload)
            .await?;
        Ok(expect_integer(frame)? == 1)
    }

    /// `EXISTS key`.
    pub async fn exists(&self, key: &[u8]) -> RedisResult<bool> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"EXISTS".to_vec(), key.to_vec()]);
        let frame = self
            .executor
            .execute("exists", key, CommandKind::Read, payload)
            .await?;
        Ok(expect_integer(frame)? == 1)
    }

    /// `TYPE key`. Returns the Redis type name (`"string"`, `"none"`, ...).
    pub async fn key_type(&self, key: &[u8]) -> RedisResult<String> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"TYPE".to_vec(), key.to_vec()]);
        let frame = self
            .executor
            .execute("type", key, CommandKind::Read, payload)
            .await?;
        expect_simple_string(frame)
    }

    /// `TTL key`. `-1` means no expiry, `-2` means the key does not exist.
    pub async fn ttl(&self, key: &[u8]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"TTL".to_vec(), key.to_vec()]);
        let frame = self
            .executor
            .execute("ttl", key, CommandKind::Read, payload)
            .await?;
        expect_integer(frame)
    }

    /// `PING`, expecting the `+PONG` simple string.
    pub async fn ping(&self) -> RedisResult<()> {
        let payload = build(&[b"PING".to_vec()]);
        let frame = self
            .executor
            .execute("ping", b"", CommandKind::Read, payload)
            .await?;
        expect_simple_string(frame).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        let err = validate_non_empty("key", b"").unwrap_err();
        assert!(matches!(err, crate::error::RedisError::IllegalArgument(_)));
    }

    #[test]
    fn rejects_non_positive_expiry() {
        assert!(validate_positive("seconds", 0).is_err());
        assert!(validate_positive("seconds", -1).is_err());
        assert!(validate_positive("seconds", 1).is_ok());
    }
}
