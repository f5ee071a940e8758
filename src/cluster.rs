//! Cluster router: stateless, client-side key→node hashing with automatic
//! skipping of unhealthy nodes.
//!
//! Deliberately not Redis Cluster slot routing — no MOVED/ASK, no
//! server-driven slot map. CRC32 mod N with linear probing over unhealthy
//! hosts instead.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use crate::channel::Channel;
use crate::error::{RedisError, RedisResult};
use crate::pool::ChannelPool;

/// CRC32 of the UTF-8 key bytes — the routing fingerprint.
pub fn fingerprint(key: &[u8]) -> u32 {
    crc32fast::hash(key)
}

pub struct ClusterRouter {
    pool: Arc<ChannelPool>,
}

impl ClusterRouter {
    pub fn new(pool: Arc<ChannelPool>) -> Self {
        Self { pool }
    }

    /// Routes `key` to the first available slot starting at
    /// `fingerprint(key) mod N`, scanning forward and wrapping once.
    ///
    /// For a fixed, fully-healthy host list this always returns the same
    /// slot for the same key; if that slot's host is down, it returns the
    /// first still-available neighbor found by scanning forward.
    pub fn route(&self, key: &[u8]) -> RedisResult<Channel> {
        let n = self.pool.len();
        if n == 0 {
            return Err(RedisError::IllegalState("cluster router has no hosts".into()));
        }
        let start = (fingerprint(key) as usize) % n;
        for i in 0..n {
            let idx = (start + i) % n;
            if let Some(channel) = self.pool.channel_at(idx) {
                return Ok(channel);
            }
        }
        crate::metrics::record_unavailable_client();
        Err(RedisError::IllegalState(
            "no cluster node is currently available".into(),
        ))
    }

    /// Groups `keys` by their routed channel, issues one sub-request per
    /// group concurrently via `fetch`, and merges found entries into a
    /// single map. A sub-request error increments `multiGetError` but does
    /// not fail the whole call — its keys are simply absent from the result,
    /// indistinguishable from keys that were never found.
    pub async fn multi_get_fanout<T, F, Fut>(
        &self,
        keys: &[Bytes],
        fetch: F,
    ) -> HashMap<Bytes, T>
    where
        F: Fn(Channel, Vec<Bytes>) -> Fut,
        Fut: Future<Output = RedisResult<Vec<Option<T>>>>,
    {
        let mut groups: HashMap<String, (Channel, Vec<Bytes>)> = HashMap::new();
        for key in keys {
            match self.route(key) {
                Ok(channel) => {
                    groups
                        .entry(channel.host().to_string())
                        .or_insert_with(|| (channel.clone(), Vec::new()))
                        .1
                        .push(key.clone());
                }
                Err(_) => {
                    // Already counted by `route`'s own unavailable-client metric.
                }
            }
        }

        let futures = groups.into_values().map(|(channel, group_keys)| {
            let fetch = &fetch;
            async move {
                let result = fetch(channel, group_keys.clone()).await;
                (group_keys, result)
            }
        });

        let mut merged = HashMap::new();
        for (group_keys, result) in futures::future::join_all(futures).await {
            match result {
                Ok(values) => {
                    for (key, value) in group_keys.into_iter().zip(values) {
                        if let Some(value) = value {
                            merged.insert(key, value);
                        }
                    }
                }
                Err(_) => crate::metrics::record_multi_get_error(),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(fingerprint(b"hello"), fingerprint(b"hello"));
    }

    #[test]
    fn fingerprint_distinguishes_keys() {
        assert_ne!(fingerprint(b"hello"), fingerprint(b"world"));
    }
}
