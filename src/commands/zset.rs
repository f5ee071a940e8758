//! Sorted set family: ZADD (with mode flags), ZINCRBY, ZREM,
//! ZREMRANGEBYRANK/SCORE, ZSCORE, ZRANK/ZREVRANK, ZCARD, ZCOUNT,
//! ZRANGE/ZREVRANGE (WITHSCORES), ZRANGEBYSCORE/ZREVRANGEBYSCORE
//! (WITHSCORES, LIMIT). Members round-trip through the opaque transcoder.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{build, bulk_as_f64, expect_array, expect_bulk, expect_integer, validate_non_empty};
use crate::error::{RedisError, RedisResult};
use crate::executor::{CommandKind, Executor};
use crate::transcode::OpaqueTranscoder;

/// `ZADD` mode mapping: the default adds-or-replaces and
/// returns the count of newly added elements; `Ch` additionally counts
/// updated elements; `Nx`/`Xx` restrict to insert-only / update-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZAddMode {
    Default,
    Ch,
    Nx,
    Xx,
}

impl ZAddMode {
    fn flag(self) -> Option<&'static [u8]> {
        match self {
            ZAddMode::Default => None,
            ZAddMode::Ch => Some(b"CH"),
            ZAddMode::Nx => Some(b"NX"),
            ZAddMode::Xx => Some(b"XX"),
        }
    }
}

/// A score range bound: `-inf`/`+inf`, or a finite value that may be
/// exclusive (the `(` prefix on the wire).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    NegInf,
    PosInf,
    Inclusive(f64),
    Exclusive(f64),
}

impl Bound {
    fn to_wire(self) -> Vec<u8> {
        match self {
            Bound::NegInf => b"-inf".to_vec(),
            Bound::PosInf => b"+inf".to_vec(),
            Bound::Inclusive(v) => format!("{v}").into_bytes(),
            Bound::Exclusive(v) => format!("({v}").into_bytes(),
        }
    }
}

pub struct SortedSetCommands<T> {
    executor: Arc<Executor>,
    transcoder: OpaqueTranscoder,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> SortedSetCommands<T> {
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
    /// `0`.
    pub async fn zadd(&self, key: &[u8], mode: ZAddMode, members: &[(T, f64)]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        if members.is_empty() {
            return Ok(0);
        }
        let mut args = vec![b"ZADD".to_vec(), key.to_vec()];
        if let Some(flag) = mode.flag() {
            args.push(flag.to_vec());
        }
        for (member, score) in members {
            args.push(format!("{score}").into_bytes());
            args.push(self.encode(member)?);
        }
        let payload = build(&args);
        let frame = self.executor.execute("zadd", key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn zincrby(&self, key: &[u8], member: &T, delta: f64) -> RedisResult<f64> {
        validate_non_empty("key", key)?;
        let payload = build(&[
            b"ZINCRBY".to_vec(),
            key.to_vec(),
            format!("{delta}").into_bytes(),
            self.encode(member)?,
        ]);
        let frame = self.executor.execute("zincrby", key, CommandKind::Write, payload).await?;
        let bytes = expect_bulk(frame)?
            .ok_or_else(|| RedisError::UnexpectedError("ZINCRBY returned nil".into()))?;
        bulk_as_f64(&bytes)
    }

    pub async fn zrem(&self, key: &[u8], members: &[T]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        if members.is_empty() {
            return Ok(0);
        }
        let mut args = vec![b"ZREM".to_vec(), key.to_vec()];
        for m in members {
            args.push(self.encode(m)?);
        }
        let payload = build(&args);
        let frame = self.executor.execute("zrem", key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn zremrangebyrank(&self, key: &[u8], start: i64, stop: i64) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[
            b"ZREMRANGEBYRANK".to_vec(),
            key.to_vec(),
            start.to_string().into_bytes(),
            stop.to_string().into_bytes(),
        ]);
        let frame = self
            .executor
            .execute("zremrangebyrank", key, CommandKind::Write, payload)
            .await?;
        expect_integer(frame)
    }

    pub async fn zremrangebyscore(&self, key: &[u8], min: Bound, max: Bound) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[
            b"ZREMRANGEBYSCORE".to_vec(),
            key.to_vec(),
            min.to_wire(),
            max.to_wire(),
        ]);
        let frame = self
            .executor
            .execute("zremrangebyscore", key, CommandKind::Write, payload)
            .await?;
        expect_integer(frame)
    }

    pub async fn zscore(&self, key: &[u8], member: &T) -> RedisResult<Option<f64>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"ZSCORE".to_vec(), key.to_vec(), self.encode(member)?]);
        let frame = self.executor.execute("zscore", key, CommandKind::Read, payload).await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(bulk_as_f64(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn rank(&self, cmd: &'static str, method: &'static str, key: &[u8], member: &T) -> RedisResult<Option<i64>> {
        validate_non_empty("key", key)?;
        let payload = build(&[cmd.as_bytes().to_vec(), key.to_vec(), self.encode(member)?]);
        let frame = self.executor.execute(method, key, CommandKind::Read, payload).await?;
        match frame {
            crate::protocol::RedisData::Integer(n) => Ok(Some(n)),
            crate::protocol::RedisData::BulkString(None) => Ok(None),
            other => Err(RedisError::UnexpectedError(format!("unexpected ZRANK reply: {other:?}"))),
        }
    }

    /// `reverse = false` → `ZRANK`, `reverse = true` → `ZREVRANK`.
    pub async fn rank_of(&self, key: &[u8], member: &T, reverse: bool) -> RedisResult<Option<i64>> {
        if reverse {
            self.rank("ZREVRANK", "zrevrank", key, member).await
        } else {
            self.rank("ZRANK", "zrank", key, member).await
        }
    }

    pub async fn zcard(&self, key: &[u8]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"ZCARD".to_vec(), key.to_vec()]);
        let frame = self.executor.execute("zcard", key, CommandKind::Read, payload).await?;
        expect_integer(frame)
    }

    pub async fn zcount(&self, key: &[u8], min: Bound, max: Bound) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"ZCOUNT".to_vec(), key.to_vec(), min.to_wire(), max.to_wire()]);
        let frame = self.executor.execute("zcount", key, CommandKind::Read, payload).await?;
        expect_integer(frame)
    }

    fn parse_members(&self, frame: crate::protocol::RedisData, with_scores: bool) -> RedisResult<Vec<(T, Option<f64>)>> {
        let items = expect_array(frame)?.unwrap_or_default();
        if !with_scores {
            return items
                .into_iter()
                .map(|item| match expect_bulk(item)? {
                    Some(bytes) => Ok((self.decode(&bytes)?, None)),
                    None => Err(RedisError::UnexpectedError("nil member in range reply".into())),
                })
                .collect();
        }
        let mut out = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let Some(member) = iter.next() {
            let score = iter
                .next()
                .ok_or_else(|| RedisError::UnexpectedError("odd-length WITHSCORES reply".into()))?;
            let member_bytes = expect_bulk(member)?
                .ok_or_else(|| RedisError::UnexpectedError("nil member in range reply".into()))?;
            let score_bytes = expect_bulk(score)?
                .ok_or_else(|| RedisError::UnexpectedError("nil score in range reply".into()))?;
            out.push((self.decode(&member_bytes)?, Some(bulk_as_f64(&score_bytes)?)));
        }
        Ok(out)
    }

    /// `reverse = false` → `ZRANGE`, `reverse = true` → `ZREVRANGE`.
    /// An out-of-range rank does not error; it returns an empty vector.
    pub async fn range(
        &self,
        key: &[u8],
        start: i64,
        stop: i64,
        reverse: bool,
        with_scores: bool,
    ) -> RedisResult<Vec<(T, Option<f64>)>> {
        validate_non_empty("key", key)?;
        let cmd = if reverse { "ZREVRANGE" } else { "ZRANGE" };
        let method = if reverse { "zrevrange" } else { "zrange" };
        let mut args = vec![
            cmd.as_bytes().to_vec(),
            key.to_vec(),
            start.to_string().into_bytes(),
            stop.to_string().into_bytes(),
        ];
        if with_scores {
            args.push(b"WITHSCORES".to_vec());
        }
        let payload = build(&args);
        let frame = self.executor.execute(method, key, CommandKind::Read, payload).await?;
        self.parse_members(frame, with_scores)
    }

    /// `reverse = false` → `ZRANGEBYSCORE`, `reverse = true` →
    /// `ZREVRANGEBYSCORE`. `limit = Some((offset, count))` adds `LIMIT
    /// offset count`.
    pub async fn range_by_score(
        &self,
        key: &[u8],
        min: Bound,
        max: Bound,
        reverse: bool,
        with_scores: bool,
        limit: Option<(i64, i64)>,
    ) -> RedisResult<Vec<(T, Option<f64>)>> {
        validate_non_empty("key", key)?;
        let cmd = if reverse { "ZREVRANGEBYSCORE" } else { "ZRANGEBYSCORE" };
        let method = if reverse { "zrevrangebyscore" } else { "zrangebyscore" };
        // ZREVRANGEBYSCORE takes max before min on the wire.
        let (first, second) = if reverse { (max, min) } else { (min, max) };
        let mut args = vec![cmd.as_bytes().to_vec(), key.to_vec(), first.to_wire(), second.to_wire()];
        if with_scores {
            args.push(b"WITHSCORES".to_vec());
        }
        if let Some((offset, count)) = limit {
            args.push(b"LIMIT".to_vec());
            args.push(offset.to_string().into_bytes());
            args.push(count.to_string().into_bytes());
        }
        let payload = build(&args);
        let frame = self.executor.execute(method, key, CommandKind::Read, payload).await?;
        self.parse_members(frame, with_scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_wire_forms() {
        assert_eq!(Bound::NegInf.to_wire(), b"-inf");
        assert_eq!(Bound::PosInf.to_wire(), b"+inf");
        assert_eq!(Bound::Inclusive(1.0).to_wire(), b"1");
        assert_eq!(Bound::Exclusive(1.0).to_wire(), b"(1");
    }
}
