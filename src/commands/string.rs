//! Opaque storage family: GET, MGET, SET with the EX/NX/XX
//! modifier combinations, over the opaque transcoder. A second façade,
//! [`RawStringCommands`], covers the same commands over the raw UTF-8
//! transcoder for interop with other Redis clients.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{build, expect_bulk, expect_ok_or_nil, validate_non_empty};
use crate::error::RedisResult;
use crate::executor::{CommandKind, Executor};
use crate::transcode::{OpaqueTranscoder, RawTranscoder};

/// Whether `SET` should be unconditional, or gated on the key's prior
/// existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    None,
    /// `NX`: only set if the key does not already exist.
    IfNotExists,
    /// `XX`: only set if the key already exists.
    IfExists,
}

/// GET/MGET/SET over the opaque transcoder: arbitrary `T` round-tripped
/// through a header + optional LZF compression.
pub struct StringCommands<T> {
    executor: Arc<Executor>,
    transcoder: OpaqueTranscoder,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> StringCommands<T> {
    pub fn new(executor: Arc<Executor>) -> Self {
        let threshold = executor.config().compression_threshold;
        Self {
            executor,
            transcoder: OpaqueTranscoder::new(threshold),
            _marker: PhantomData,
        }
    }

    pub async fn get(&self, key: &[u8]) -> RedisResult<Option<T>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"GET".to_vec(), key.to_vec()]);
        let frame = self
            .executor
            .execute("get", key, CommandKind::Read, payload)
            .await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(self.transcoder.decode(&bytes)?)),
            None => {
                let host = self.executor.host_for(key, CommandKind::Read);
                crate::metrics::record_key_not_found(&host, "get");
                Ok(None)
            }
        }
    }

    /// Short-circuits to an empty map with zero I/O for an empty key list.
    pub async fn mget(&self, keys: &[Bytes]) -> std::collections::HashMap<Bytes, T> {
        if keys.is_empty() {
            return std::collections::HashMap::new();
        }
        let transcoder_threshold = self.executor.config().compression_threshold;
        self.executor
            .multi_get(
                keys,
                |group| {
                    let mut args: Vec<Vec<u8>> = vec![b"MGET".to_vec()];
                    args.extend(group.iter().map(|k| k.to_vec()));
                    build(&args)
                },
                move |frame| {
                    let transcoder = OpaqueTranscoder::new(transcoder_threshold);
                    let items = super::expect_array(frame)?.unwrap_or_default();
                    items
                        .into_iter()
                        .map(|item| match super::expect_bulk(item)? {
                            Some(bytes) => Ok(Some(transcoder.decode::<T>(&bytes)?)),
                            None => Ok(None),
                        })
                        .collect()
                },
            )
            .await
    }

    /// `SET key value [EX seconds] [NX|XX]`. Returns `true` if the value was
    /// written, `false` if an `NX`/`XX` condition was not satisfied.
    pub async fn set(
        &self,
        key: &[u8],
        value: &T,
        ttl: Option<Duration>,
        condition: SetCondition,
    ) -> RedisResult<bool> {
        validate_non_empty("key", key)?;
        let (encoded, saved) = self.transcoder.encode(value)?;
        if saved > 0 {
            let host = self.executor.host_for(key, CommandKind::Write);
            crate::metrics::record_compression(&host, saved);
        }
        let payload = build_set_command(key, &encoded, ttl, condition);
        let frame = self
            .executor
            .execute("set", key, CommandKind::Write, payload)
            .await?;
        expect_ok_or_nil(frame)
    }
}

/// GET/MGET/SET over the raw UTF-8 transcoder: no header, no compression —
/// for interop with other Redis clients writing plain strings.
pub struct RawStringCommands {
    executor: Arc<Executor>,
}

impl RawStringCommands {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    pub async fn get(&self, key: &[u8]) -> RedisResult<Option<String>> {
        validate_non_empty("key", key)?;
        let payload = build(&[b"GET".to_vec(), key.to_vec()]);
        let frame = self
            .executor
            .execute("get_raw", key, CommandKind::Read, payload)
            .await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(RawTranscoder::decode(&bytes)?)),
            None => {
                let host = self.executor.host_for(key, CommandKind::Read);
                crate::metrics::record_key_not_found(&host, "get_raw");
                Ok(None)
            }
        }
    }

    pub async fn mget(&self, keys: &[Bytes]) -> std::collections::HashMap<Bytes, String> {
        if keys.is_empty() {
            return std::collections::HashMap::new();
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
                            Some(bytes) => Ok(Some(RawTranscoder::decode(&bytes)?)),
                            None => Ok(None),
                        })
                        .collect()
                },
            )
            .await
    }

    pub async fn set(
        &self,
        key: &[u8],
        value: &str,
        ttl: Option<Duration>,
        condition: SetCondition,
    ) -> RedisResult<bool> {
        validate_non_empty("key", key)?;
        let encoded = RawTranscoder::encode(value);
        let payload = build_set_command(key, &encoded, ttl, condition);
        let frame = self
            .executor
            .execute("set_raw", key, CommandKind::Write, payload)
            .await?;
        expect_ok_or_nil(frame)
    }
}

fn build_set_command(key: &[u8], value: &[u8], ttl: Option<Duration>, condition: SetCondition) -> Bytes {
    let mut args: Vec<Vec<u8>> = vec![b"SET".to_vec(), key.to_vec(), value.to_vec()];
    if let Some(ttl) = ttl {
        args.push(b"EX".to_vec());
        args.push(ttl.as_secs().to_string().into_bytes());
    }
    match condition {
        SetCondition::None => {}
        SetCondition::IfNotExists => args.push(b"NX".to_vec()),
        SetCondition::IfExists => args.push(b"XX".to_vec()),
    }
    build(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_command_includes_ex_and_nx() {
        let payload = build_set_command(b"k", b"v", Some(Duration::from_secs(30)), SetCondition::IfNotExists);
        let text = String::from_utf8_lossy(&payload);
        assert!(text.contains("SET"));
        assert!(text.contains("EX"));
        assert!(text.contains("30"));
        assert!(text.contains("NX"));
    }

    #[test]
    fn set_command_unconditional_has_no_modifiers() {
        let payload = build_set_command(b"k", b"v", None, SetCondition::None);
        let text = String::from_utf8_lossy(&payload);
        assert!(!text.contains("EX"));
        assert!(!text.contains("NX"));
        assert!(!text.contains("XX"));
    }
}
