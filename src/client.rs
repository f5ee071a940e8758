//! Top-level entry points: one concrete client exposing typed command
//! façades over a single shared [`Executor`]. There is no role-inheritance
//! tree — every façade below is constructed on demand from the same
//! `Arc<Executor>` and owns no I/O of its own.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::channel::Channel;
use crate::cluster::ClusterRouter;
use crate::commands::counter::CounterCommands;
use crate::commands::geo::GeoCommands;
use crate::commands::hash::HashCommands;
use crate::commands::key::KeyCommands;
use crate::commands::list::ListCommands;
use crate::commands::set::SetCommands;
use crate::commands::string::{RawStringCommands, StringCommands};
use crate::commands::zset::SortedSetCommands;
use crate::config::ClientConfig;
use crate::error::RedisResult;
use crate::executor::Executor;
use crate::pool::{ChannelPool, PoolEventListener};
use crate::replication::ReplicationRouter;

/// A Redis client core instance: one [`Executor`] dispatching over either a
/// single [`Channel`], a sharded [`ChannelPool`]/[`ClusterRouter`], or a
/// [`ReplicationRouter`].
#[derive(Clone)]
pub struct RedisClient {
    executor: Arc<Executor>,
}

impl RedisClient {
    /// Connects a single Channel to one Redis host. No sharding, no
    /// replication — the simplest construction.
    pub async fn connect(host: impl Into<String>, config: ClientConfig) -> RedisResult<RedisClient> {
        config.validate()?;
        let channel = Channel::connect(host, config.clone(), Arc::new(|_: &str| {})).await?;
        Ok(RedisClient {
            executor: Executor::single(channel, config),
        })
    }

    /// Connects a [`ChannelPool`] across `hosts` and routes by
    /// `CRC32(key) mod N`, skipping unhealthy hosts.
    pub async fn connect_cluster(
        hosts: Vec<String>,
        config: ClientConfig,
        listener: Option<Arc<dyn PoolEventListener>>,
    ) -> RedisResult<RedisClient> {
        config.validate()?;
        let pool = ChannelPool::connect(hosts, config.clone(), crate::pool::DEFAULT_REVIVAL_INTERVAL, listener).await?;
        Ok(RedisClient {
            executor: Executor::pooled(pool, config),
        })
    }

    /// Connects one master and `slave_hosts.len()` slaves, splitting reads
    /// and writes between them. `fall_through_to_master` controls whether
    /// reads fall back to the master when every slave is down (default
    /// `true`, matching [`ReplicationRouter::new`]).
    pub async fn connect_replicated(
        master_host: impl Into<String>,
        slave_hosts: Vec<String>,
        config: ClientConfig,
        fall_through_to_master: bool,
    ) -> RedisResult<RedisClient> {
        config.validate()?;
        let master = ChannelPool::connect(
            vec![master_host.into()],
            config.clone(),
            crate::pool::DEFAULT_REVIVAL_INTERVAL,
            None,
        )
        .await?;
        let slaves = ChannelPool::connect(slave_hosts, config.clone(), crate::pool::DEFAULT_REVIVAL_INTERVAL, None).await?;
        let router = Arc::new(ReplicationRouter::with_fall_through(master, slaves, fall_through_to_master));
        Ok(RedisClient {
            executor: Executor::replicated(router, config),
        })
    }

    /// Wraps an already-constructed [`ClusterRouter`] (e.g. one built by the
    /// caller over a hand-assembled [`ChannelPool`]).
    pub fn from_cluster_router(router: Arc<ClusterRouter>, config: ClientConfig) -> RedisClient {
        RedisClient {
            executor: Executor::clustered(router, config),
        }
    }

    pub fn executor(&self) -> Arc<Executor> {
        self.executor.clone()
    }

    pub fn keys(&self) -> KeyCommands {
        KeyCommands::new(self.executor.clone())
    }

    pub fn counters(&self) -> CounterCommands {
        CounterCommands::new(self.executor.clone())
    }

    pub fn strings<T: Serialize + DeserializeOwned>(&self) -> StringCommands<T> {
        StringCommands::new(self.executor.clone())
    }

    pub fn raw_strings(&self) -> RawStringCommands {
        RawStringCommands::new(self.executor.clone())
    }

    pub fn lists<T: Serialize + DeserializeOwned>(&self) -> ListCommands<T> {
        ListCommands::new(self.executor.clone())
    }

    pub fn sets<T: Serialize + DeserializeOwned>(&self) -> SetCommands<T> {
        SetCommands::new(self.executor.clone())
    }

    pub fn sorted_sets<T: Serialize + DeserializeOwned>(&self) -> SortedSetCommands<T> {
        SortedSetCommands::new(self.executor.clone())
    }

    pub fn hashes<T: Serialize + DeserializeOwned>(&self) -> HashCommands<T> {
        HashCommands::new(self.executor.clone())
    }

    pub fn geo<T: Serialize + DeserializeOwned>(&self) -> GeoCommands<T> {
        GeoCommands::new(self.executor.clone())
    }
}
