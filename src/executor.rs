//! Single internal Executor: the one place a built command turns into a
//! dispatched `send()`. Typed façades (`crate::commands::*`) hold an
//! `Arc<Executor>` and never touch I/O directly — there is no role
//! hierarchy, just one concrete routing point.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::channel::Channel;
use crate::cluster::ClusterRouter;
use crate::config::ClientConfig;
use crate::error::{RedisError, RedisResult};
use crate::pool::ChannelPool;
use crate::protocol::RedisData;
use crate::replication::ReplicationRouter;

/// Whether a command is read-only or mutates state, for the replication
/// router's master/slave split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Read,
    Write,
}

enum Dispatch {
    Single(Channel),
    Pooled(Arc<ChannelPool>, Arc<ClusterRouter>),
    Clustered(Arc<ClusterRouter>),
    Replicated(Arc<ReplicationRouter>),
}

pub struct Executor {
    dispatch: Dispatch,
    config: ClientConfig,
}

impl Executor {
    pub fn single(channel: Channel, config: ClientConfig) -> Arc<Executor> {
        Arc::new(Executor {
            dispatch: Dispatch::Single(channel),
            config,
        })
    }

    pub fn pooled(pool: Arc<ChannelPool>, config: ClientConfig) -> Arc<Executor> {
        let router = Arc::new(ClusterRouter::new(pool.clone()));
        Arc::new(Executor {
            dispatch: Dispatch::Pooled(pool, router),
            config,
        })
    }

    pub fn clustered(router: Arc<ClusterRouter>, config: ClientConfig) -> Arc<Executor> {
        Arc::new(Executor {
            dispatch: Dispatch::Clustered(router),
            config,
        })
    }

    pub fn replicated(router: Arc<ReplicationRouter>, config: ClientConfig) -> Arc<Executor> {
        Arc::new(Executor {
            dispatch: Dispatch::Replicated(router),
            config,
        })
    }

    /// Best-effort host label for metrics recorded outside of `execute`
    /// itself — a pre-wire compression measurement, or a post-response
    /// key-not-found counter. Resolves the same routing `execute` would use
    /// for `key`/`kind` without dispatching anything; falls back to
    /// `"unknown"` if no channel is currently available.
    pub fn host_for(&self, key: &[u8], kind: CommandKind) -> String {
        self.pick_channel(key, kind)
            .map(|channel| channel.host().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }

    fn pick_channel(&self, key: &[u8], kind: CommandKind) -> RedisResult<Channel> {
        match &self.dispatch {
            Dispatch::Single(channel) => {
                if channel.is_available() {
                    Ok(channel.clone())
                } else {
                    Err(RedisError::IllegalState(format!(
                        "channel {} is closed",
                        channel.host()
                    )))
                }
            }
            Dispatch::Pooled(_, router) => router.route(key),
            Dispatch::Clustered(router) => router.route(key),
            Dispatch::Replicated(router) => match kind {
                CommandKind::Write => router.route_write(),
                CommandKind::Read => router.route_read(),
            },
        }
    }

    /// Builds, dispatches, times, and records one command. `method` and
    /// `key` are used only for observability (slow-log, per-kind error
    /// counters) — the caller has already built `payload`.
    pub async fn execute(
        &self,
        method: &'static str,
        key: &[u8],
        kind: CommandKind,
        payload: Bytes,
    ) -> RedisResult<RedisData> {
        let started = Instant::now();
        let channel = match self.pick_channel(key, kind) {
            Ok(channel) => channel,
            Err(e) => {
                crate::metrics::record_execution(
                    "unknown",
                    method,
                    started.elapsed(),
                    Some(e.metric_label()),
                );
                return Err(e);
            }
        };
        let host = channel.host().to_string();
        let result = channel.send(payload, self.config.timeout).await;
        let elapsed = started.elapsed();
        crate::metrics::record_execution(&host, method, elapsed, result.as_ref().err().map(RedisError::metric_label));
        if elapsed > self.config.slow_execution_threshold {
            crate::metrics::record_slow_execution(&host, method, elapsed, &String::from_utf8_lossy(key));
        }
        result
    }

    /// Multi-key fan-out: one sub-request per distinct target channel,
    /// dispatched concurrently, merged into a single map. Used by `MGET`
    /// across every family that supports it.
    pub async fn multi_get<T, B, P>(&self, keys: &[Bytes], build: B, parse: P) -> HashMap<Bytes, T>
    where
        B: Fn(&[Bytes]) -> Bytes,
        P: Fn(RedisData) -> RedisResult<Vec<Option<T>>>,
    {
        if keys.is_empty() {
            return HashMap::new();
        }
        match &self.dispatch {
            Dispatch::Clustered(router) | Dispatch::Pooled(_, router) => {
                let fetch = |channel: Channel, group_keys: Vec<Bytes>| {
                    let build = &build;
                    let parse = &parse;
                    async move {
                        let payload = build(&group_keys);
                        let frame = channel.send(payload, self.config.timeout).await?;
                        parse(frame)
                    }
                };
                router.multi_get_fanout(keys, fetch).await
            }
            Dispatch::Single(_) | Dispatch::Replicated(_) => {
                let channel = match self.pick_channel(&keys[0], CommandKind::Read) {
                    Ok(channel) => channel,
                    Err(_) => {
                        crate::metrics::record_multi_get_error();
                        return HashMap::new();
                    }
                };
                let payload = build(keys);
                let outcome = channel
                    .send(payload, self.config.timeout)
                    .await
                    .and_then(|frame| parse(frame));
                match outcome {
                    Ok(values) => keys
                        .iter()
                        .cloned()
                        .zip(values)
                        .filter_map(|(k, v)| v.map(|v| (k, v)))
                        .collect(),
                    Err(_) => {
                        crate::metrics::record_multi_get_error();
                        HashMap::new()
                    }
                }
            }
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
