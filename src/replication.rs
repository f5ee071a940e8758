//! Replication router: master-for-write, random-slave-for-read dispatching.

use std::sync::Arc;

use rand::Rng;

use crate::channel::Channel;
use crate::cluster::ClusterRouter;
use crate::error::{RedisError, RedisResult};
use crate::pool::ChannelPool;

/// One master pool of size 1, and a slave pool of size >= 1.
pub struct ReplicationRouter {
    master: Arc<ChannelPool>,
    slaves: Arc<ChannelPool>,
    slave_router: ClusterRouter,
    /// If every slave is down, fall reads through to the master. Default
    /// `true`.
    fall_through_to_master: bool,
}

impl ReplicationRouter {
    pub fn new(master: Arc<ChannelPool>, slaves: Arc<ChannelPool>) -> Self {
        Self::with_fall_through(master, slaves, true)
    }

    pub fn with_fall_through(
        master: Arc<ChannelPool>,
        slaves: Arc<ChannelPool>,
        fall_through_to_master: bool,
    ) -> Self {
        let slave_router = ClusterRouter::new(slaves.clone());
        Self {
            master,
            slaves,
            slave_router,
            fall_through_to_master,
        }
    }

    /// Writes always dispatch to the master; if it is down, writes fail.
    pub fn route_write(&self) -> RedisResult<Channel> {
        self.master
            .channel_at(0)
            .ok_or_else(|| RedisError::IllegalState("master channel is unavailable".into()))
    }

    /// Reads dispatch to a slave chosen uniformly among the healthy ones
    /// (hashed by a random key so the same selection code as the cluster
    /// router applies); if every slave is down, falls through to the master
    /// when configured to do so.
    pub fn route_read(&self) -> RedisResult<Channel> {
        let probe: [u8; 8] = rand::rng().random();
        match self.slave_router.route(&probe) {
            Ok(channel) => Ok(channel),
            Err(_) if self.fall_through_to_master => self.route_write(),
            Err(e) => Err(e),
        }
    }

    pub fn slaves(&self) -> &Arc<ChannelPool> {
        &self.slaves
    }

    pub fn master(&self) -> &Arc<ChannelPool> {
        &self.master
    }
}
