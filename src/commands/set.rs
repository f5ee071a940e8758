//! Set family: SADD, SREM, SISMEMBER, SCARD, SRANDMEMBER, SPOP,
//! SMEMBERS. Members round-trip through the opaque transcoder.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{build, expect_array, expect_bulk, expect_integer, validate_non_empty};
use crate::error::{RedisError, RedisResult};
use crate::executor::{CommandKind, Executor};
use crate::transcode::OpaqueTranscoder;

pub struct SetCommands<T> {
    executor: Arc<Executor>,
    transcoder: OpaqueTranscoder,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> SetCommands<T> {
    pub fn new(executor: Arc<Executor>) -> Self {
        let threshold = executor.config().compression_threshold;
        Self {
            executor,
            transcoder: OpaqueTranscoder::new(threshold),
            _marker: PhantomData,
        }
    }

    fn encode(&self, value: &T) -> RedisResult<Vec<u8>> {
        Ok(self.transcoder.encode(value)?.0.to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> RedisResult<T> {
        self.transcoder.decode(bytes)
    }

    /// Elides a zero-length `members` input with a short-circuit return of
    /// `0` rather than emitting an empty `SADD`.
    pub async fn sadd(&self, key: &[u8], members: &[T]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        if members.is_empty() {
            return Ok(0);
        }
        let mut args = vec![b"SADD".to_vec(), key.to_vec()];
        for m in members {
            args.push(self.encode(m)?);
        }
        let payload = build(&args);
        let frame = self.executor.execute("sadd", key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn srem(&self, key: &[u8], members: &[T]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        if members.is_empty() {
            return Ok(0);
        }
        let mut args = vec![b"SREM".to_vec(), key.to_vec()];
        for m in members {
            args.push(self.encode(m)?);
        }
        let payload = build(&args);
        let frame = self.executor.execute("srem", key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn sismember(&self, key: &[u8], member: &T) -> RedisResult<bool> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"SISMEMBER".to_vec(), key.to_vec(), self.encode(member)?]);
        let frame = self.executor.execute("sismember", key, CommandKind::Read, payload).await?;
        Ok(expect_integer(frame)? == 1)
    }

    pub async fn scard(&self, key: &[u8]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"SCARD".to_vec(), key.to_vec()]);
        let frame = self.executor.execute("scard", key, CommandKind::Read, payload).await?;
        expect_integer(frame)
    }

    pub async fn srandmember(&self, key: &[u8]) -> RedisResult<Option<T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"SRANDMEMBER".to_vec(), key.to_vec()]);
        let frame = self
            .executor
            .execute("srandmember", key, CommandKind::Read, payload)
            .await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn spop(&self, key: &[u8]) -> RedisResult<Option<T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"SPOP".to_vec(), key.to_vec()]);
        let frame = self.executor.execute("spop", key, CommandKind::Write, payload).await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn smembers(&self, key: &[u8]) -> RedisResult<Vec<T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"SMEMBERS".to_vec(), key.to_vec()]);
        let frame = self.executor.execute("smembers", key, CommandKind::Read, payload).await?;
        let items = expect_array(frame)?.unwrap_or_default();
        items
            .into_iter()
            .map(|item| match expect_bulk(item)? {
                Some(bytes) => self.decode(&bytes),
                None => Err(RedisError::UnexpectedError("nil element in SMEMBERS reply".into())),
            })
            .collect()
    }
}
