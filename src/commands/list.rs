//! List family: LPUSH/RPUSH(X), LPOP/RPOP, LINSERT, LSET, LREM,
//! LTRIM, LLEN, LINDEX, LRANGE. Elements round-trip through the opaque
//! transcoder, the same as the string family.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{build, expect_array, expect_bulk, expect_integer, validate_non_empty};
use crate::error::{RedisError, RedisResult};
use crate::executor::{CommandKind, Executor};
use crate::transcode::OpaqueTranscoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

impl Side {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            Side::Before => b"BEFORE",
            Side::After => b"AFTER",
        }
    }
}

pub struct ListCommands<T> {
    executor: Arc<Executor>,
    transcoder: OpaqueTranscoder,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> ListCommands<T> {
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

    async fn push(&self, method: &'static str, cmd: &'static str, key: &[u8], values: &[T]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        if values.is_empty() {
            return Ok(0);
        }
        let mut args = vec![cmd.as_bytes().to_vec(), key.to_vec()];
        for v in values {
            args.push(self.encode(v)?);
        }
        let payload = build(&args);
        let frame = self.executor.execute(method, key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn lpush(&self, key: &[u8], values: &[T]) -> RedisResult<i64> {
        self.push("lpush", "LPUSH", key, values).await
    }

    pub async fn rpush(&self, key: &[u8], values: &[T]) -> RedisResult<i64> {
        self.push("rpush", "RPUSH", key, values).await
    }

    /// `LPUSHX`/`RPUSHX`: push only if the key already exists as a list.
    pub async fn lpushx(&self, key: &[u8], value: &T) -> RedisResult<i64> {
        self.push("lpushx", "LPUSHX", key, std::slice::from_ref(value)).await
    }

    pub async fn rpushx(&self, key: &[u8], value: &T) -> RedisResult<i64> {
        self.push("rpushx", "RPUSHX", key, std::slice::from_ref(value)).await
    }

    async fn pop(&self, method: &'static str, cmd: &'static str, key: &[u8]) -> RedisResult<Option<T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[cmd.as_bytes().to_vec(), key.to_vec()]);
        let frame = self.executor.execute(method, key, CommandKind::Write, payload).await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn lpop(&self, key: &[u8]) -> RedisResult<Option<T>> {
        self.pop("lpop", "LPOP", key).await
    }

    pub async fn rpop(&self, key: &[u8]) -> RedisResult<Option<T>> {
        self.pop("rpop", "RPOP", key).await
    }

    /// `LINSERT key BEFORE|AFTER pivot value`. Returns the new length, or
    /// `-1` if the pivot was not found.
    pub async fn linsert(&self, key: &[u8], side: Side, pivot: &T, value: &T) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let args = vec![
            b"LINSERT".to_vec(),
            key.to_vec(),
            side.as_bytes().to_vec(),
            self.encode(pivot)?,
            self.encode(value)?,
        ];
        let payload = build(&args);
        let frame = self.executor.execute("linsert", key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn lset(&self, key: &[u8], index: i64, value: &T) -> RedisResult<()> {
        validate_non_empty("key", key)?;
        let args = vec![
            b"LSET".to_vec(),
            key.to_vec(),
            index.to_string().into_bytes(),
            self.encode(value)?,
        ];
        let payload = build(&args);
        let frame = self.executor.execute("lset", key, CommandKind::Write, payload).await?;
        super::expect_ok(frame)
    }

    /// `LREM key count value`. Positive `count` removes from head, negative
    /// from tail, `0` removes all occurrences.
    pub async fn lrem(&self, key: &[u8], count: i64, value: &T) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let args = vec![
            b"LREM".to_vec(),
            key.to_vec(),
            count.to_string().into_bytes(),
            self.encode(value)?,
        ];
        let payload = build(&args);
        let frame = self.executor.execute("lrem", key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn ltrim(&self, key: &[u8], start: i64, stop: i64) -> RedisResult<()> {
        validate_non_empty("key", key)?;
        let payload = build(&[
            b"LTRIM".to_vec(),
            key.to_vec(),
            start.to_string().into_bytes(),
            stop.to_string().into_bytes(),
        ]);
        let frame = self.executor.execute("ltrim", key, CommandKind::Write, payload).await?;
        super::expect_ok(frame)
    }

    pub async fn llen(&self, key: &[u8]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"LLEN".to_vec(), key.to_vec()]);
        let frame = self.executor.execute("llen", key, CommandKind::Read, payload).await?;
        expect_integer(frame)
    }

    /// Negative indices address from the tail.
    pub async fn lindex(&self, key: &[u8], index: i64) -> RedisResult<Option<T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"LINDEX".to_vec(), key.to_vec(), index.to_string().into_bytes()]);
        let frame = self.executor.execute("lindex", key, CommandKind::Read, payload).await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// An out-of-range range does not error; it returns an empty vector.
    pub async fn lrange(&self, key: &[u8], start: i64, stop: i64) -> RedisResult<Vec<T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[
            b"LRANGE".to_vec(),
            key.to_vec(),
            start.to_string().into_bytes(),
            stop.to_string().into_bytes(),
        ]);
        let frame = self.executor.execute("lrange", key, CommandKind::Read, payload).await?;
        let items = expect_array(frame)?.unwrap_or_default();
        items
            .into_iter()
            .map(|item| match expect_bulk(item)? {
                Some(bytes) => self.decode(&bytes),
                None => Err(RedisError::UnexpectedError("nil element in LRANGE reply".into())),
            })
            .collect()
    }
}
