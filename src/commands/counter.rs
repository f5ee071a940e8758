//! Counter family: GET/MGET interpreted as decimal integers,
//! INCRBY, and the "first-write EXPIRE" `addAndGet` operation.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use super::{build, bulk_as_i64, expect_bulk, expect_integer, validate_non_empty, validate_non_negative};
use crate::error::RedisResult;
use crate::executor::{CommandKind, Executor};

pub struct CounterCommands {
    executor: Arc<Executor>,
}

impl CounterCommands {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    pub async fn get(&self, key: &[u8]) -> RedisResult<Option<i64>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"GET".to_vec(), key.to_vec()]);
        let frame = self
            .executor
            .execute("get", key, CommandKind::Read, payload)
            .await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(bulk_as_i64(&bytes)?)),
            None => {
                let host = self.executor.host_for(key, CommandKind::Read);
                crate::metrics::record_key_not_found(&host, "get");
                Ok(None)
            }
        }
    }

    pub async fn mget(&self, keys: &[Bytes]) -> HashMap<Bytes, i64> {
        if keys.is_empty() {
            return HashMap::new();
        }
        self.executor
            .multi_get(
                keys,
                |group| {
                    let mut args: Vec<Vec<u8>> = vec![b"MGET".to_vec()];
                    args.extend(group.iter().map(|k| k.to_vec()));
                    build(&args)
                },
                |frame| {
                    let items = super::expect_array(frame)?.unwrap_or_default();
                    items
                        .into_iter()
                        .map(|item| match super::expect_bulk(item)? {
                            Some(bytes) => Ok(Some(bulk_as_i64(&bytes)?)),
                            None => Ok(None),
                        })
                        .collect()
                },
            )
            .await
    }

    /// `INCRBY key delta`.
    pub async fn incr_by(&self, key: &[u8], delta: i64) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"INCRBY".to_vec(), key.to_vec(), delta.to_string().into_bytes()]);
        let frame = self
            .executor
            .execute("incrBy", key, CommandKind::Write, payload)
            .await?;
        expect_integer(frame)
    }

    /// `INCRBY key delta`, then `EXPIRE key expireSeconds` **iff**
    /// `expireSeconds > 0` and the returned value equals `delta` — i.e. the
    /// key was brand new.
    ///
    /// This "first write wins" detection races with concurrent incrementers
    /// on the same brand-new key: two callers racing `addAndGet` on a key
    /// that does not yet exist can both observe a post-increment value equal
    /// to their own delta and both issue EXPIRE, or — if a third increment
    /// lands in between — neither may. This is documented, intentional
    /// behavior, not a bug to fix; do not rely on this call for
    /// exactly-once expiry semantics under concurrent writers.
    pub async fn add_and_get(&self, key: &[u8], delta: i64, expire_seconds: i64) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        validate_non_negative("expireSeconds", expire_seconds)?;
        let value = self.incr_by(key, delta).await?;
        if expire_seconds > 0 && value == delta {
            let expire_payload = build(&[
                b"EXPIRE".to_vec(),
                key.to_vec(),
                expire_seconds.to_string().into_bytes(),
            ]);
            if let Err(e) = self
                .executor
                .execute("expire", key, CommandKind::Write, expire_payload)
                .await
            {
                tracing::warn!(error = %e, "addAndGet follow-up EXPIRE failed");
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_bulk_parses_decimal() {
        assert_eq!(bulk_as_i64(&Bytes::from_static(b"42")).unwrap(), 42);
        assert!(bulk_as_i64(&Bytes::from_static(b"not-a-number")).is_err());
    }
}
