//! Hash family: HSET, HMSET, HSETNX, HINCRBY, HINCRBYFLOAT,
//! HDEL, HEXISTS, HLEN, HGET, HSTRLEN, HMGET, HGETALL, HKEYS, HVALS.
//! Field names are plain UTF-8; field values round-trip through the opaque
//! transcoder.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{build, bulk_as_f64, expect_array, expect_bulk, expect_integer, validate_non_empty};
use crate::error::{RedisError, RedisResult};
use crate::executor::{CommandKind, Executor};
use crate::transcode::OpaqueTranscoder;

pub struct HashCommands<T> {
    executor: Arc<Executor>,
    transcoder: OpaqueTranscoder,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> HashCommands<T> {
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

    pub async fn hset(&self, key: &[u8], field: &str, value: &T) -> RedisResult<bool> {
        validate_non_empty("key", key)?;
        validate_non_empty("field", field.as_bytes())?;
        let payload = build(&[
            b"HSET".to_vec(),
            key.to_vec(),
            field.as_bytes().to_vec(),
            self.encode(value)?,
        ]);
        let frame = self.executor.execute("hset", key, CommandKind::Write, payload).await?;
        Ok(expect_integer(frame)? == 1)
    }

    /// Short-circuits to zero I/O for an empty field map.
    pub async fn hmset(&self, key: &[u8], fields: &HashMap<String, T>) -> RedisResult<()> {
        validate_non_empty("key", key)?;
        if fields.is_empty() {
            return Ok(());
        }
        let mut args = vec![b"HMSET".to_vec(), key.to_vec()];
        for (field, value) in fields {
            args.push(field.as_bytes().to_vec());
            args.push(self.encode(value)?);
        }
        let payload = build(&args);
        let frame = self.executor.execute("hmset", key, CommandKind::Write, payload).await?;
        super::expect_ok(frame)
    }

    pub async fn hsetnx(&self, key: &[u8], field: &str, value: &T) -> RedisResult<bool> {
        validate_non_empty("key", key)?;
        let payload = build(&[
            b"HSETNX".to_vec(),
            key.to_vec(),
            field.as_bytes().to_vec(),
            self.encode(value)?,
        ]);
        let frame = self.executor.execute("hsetnx", key, CommandKind::Write, payload).await?;
        Ok(expect_integer(frame)? == 1)
    }

    pub async fn hincrby(&self, key: &[u8], field: &str, delta: i64) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[
            b"HINCRBY".to_vec(),
            key.to_vec(),
            field.as_bytes().to_vec(),
            delta.to_string().into_bytes(),
        ]);
        let frame = self.executor.execute("hincrby", key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn hincrbyfloat(&self, key: &[u8], field: &str, delta: f64) -> RedisResult<f64> {
        validate_non_empty("key", key)?;
        let payload = build(&[
            b"HINCRBYFLOAT".to_vec(),
            key.to_vec(),
            field.as_bytes().to_vec(),
            format!("{delta}").into_bytes(),
        ]);
        let frame = self
            .executor
            .execute("hincrbyfloat", key, CommandKind::Write, payload)
            .await?;
        let bytes = expect_bulk(frame)?
            .ok_or_else(|| RedisError::UnexpectedError("HINCRBYFLOAT returned nil".into()))?;
        bulk_as_f64(&bytes)
    }

    pub async fn hdel(&self, key: &[u8], fields: &[String]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        if fields.is_empty() {
            return Ok(0);
        }
        let mut args = vec![b"HDEL".to_vec(), key.to_vec()];
        args.extend(fields.iter().map(|f| f.as_bytes().to_vec()));
        let payload = build(&args);
        let frame = self.executor.execute("hdel", key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn hexists(&self, key: &[u8], field: &str) -> RedisResult<bool> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"HEXISTS".to_vec(), key.to_vec(), field.as_bytes().to_vec()]);
        let frame = self.executor.execute("hexists", key, CommandKind::Read, payload).await?;
        Ok(expect_integer(frame)? == 1)
    }

    pub async fn hlen(&self, key: &[u8]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"HLEN".to_vec(), key.to_vec()]);
        let frame = self.executor.execute("hlen", key, CommandKind::Read, payload).await?;
        expect_integer(frame)
    }

    pub async fn hget(&self, key: &[u8], field: &str) -> RedisResult<Option<T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"HGET".to_vec(), key.to_vec(), field.as_bytes().to_vec()]);
        let frame = self.executor.execute("hget", key, CommandKind::Read, payload).await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn hstrlen(&self, key: &[u8], field: &str) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"HSTRLEN".to_vec(), key.to_vec(), field.as_bytes().to_vec()]);
        let frame = self.executor.execute("hstrlen", key, CommandKind::Read, payload).await?;
        expect_integer(frame)
    }

    /// Short-circuits to an empty map for an empty field list.
    pub async fn hmget(&self, key: &[u8], fields: &[String]) -> RedisResult<HashMap<String, T>> {
        validate_non_empty("key", key)?;
        if fields.is_empty() {
            return Ok(HashMap::new());
        }
        let mut args = vec![b"HMGET".to_vec(), key.to_vec()];
        args.extend(fields.iter().map(|f| f.as_bytes().to_vec()));
        let payload = build(&args);
        let frame = self.executor.execute("hmget", key, CommandKind::Read, payload).await?;
        let items = expect_array(frame)?.unwrap_or_default();
        let mut out = HashMap::new();
        for (field, item) in fields.iter().zip(items) {
            if let Some(bytes) = expect_bulk(item)? {
                out.insert(field.clone(), self.decode(&bytes)?);
            }
        }
        Ok(out)
    }

    pub async fn hgetall(&self, key: &[u8]) -> RedisResult<HashMap<String, T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"HGETALL".to_vec(), key.to_vec()]);
        let frame = self.executor.execute("hgetall", key, CommandKind::Read, payload).await?;
        let items = expect_array(frame)?.unwrap_or_default();
        let mut out = HashMap::new();
        let mut iter = items.into_iter();
        while let Some(field) = iter.next() {
            let value = iter
                .next()
                .ok_or_else(|| RedisError::UnexpectedError("odd-length HGETALL reply".into()))?;
            let field_bytes = expect_bulk(field)?
                .ok_or_else(|| RedisError::UnexpectedError("nil field in HGETALL reply".into()))?;
            let field_name = String::from_utf8(field_bytes.to_vec())
                .map_err(|e| RedisError::UnexpectedError(format!("non-utf8 field name: {e}")))?;
            if let Some(value_bytes) = expect_bulk(value)? {
                out.insert(field_name, self.decode(&value_bytes)?);
            }
        }
        Ok(out)
    }

    pub async fn hkeys(&self, key: &[u8]) -> RedisResult<Vec<String>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"HKEYS".to_vec(), key.to_vec()]);
        let frame = self.executor.execute("hkeys", key, CommandKind::Read, payload).await?;
        let items = expect_array(frame)?.unwrap_or_default();
        items
            .into_iter()
            .map(|item| {
                let bytes = expect_bulk(item)?
                    .ok_or_else(|| RedisError::UnexpectedError("nil field in HKEYS reply".into()))?;
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| RedisError::UnexpectedError(format!("non-utf8 field name: {e}")))
            })
            .collect()
    }

    pub async fn hvals(&self, key: &[u8]) -> RedisResult<Vec<T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"HVALS".to_vec(), key.to_vec()]);
        let frame = self.executor.execute("hvals", key, CommandKind::Read, payload).await?;
        let items = expect_array(frame)?.unwrap_or_default();
        items
            .into_iter()
            .map(|item| match expect_bulk(item)? {
                Some(bytes) => self.decode(&bytes),
                None => Err(RedisError::UnexpectedError("nil value in HVALS reply".into())),
            })
            .collect()
    }
}
