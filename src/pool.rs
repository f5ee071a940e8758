//! Client pool: one Channel per configured host, health-checked and
//! revived in the background.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::channel::Channel;
use crate::config::ClientConfig;
use crate::error::{RedisError, RedisResult};

/// Default revival loop cadence: once per 5 seconds per host.
pub const DEFAULT_REVIVAL_INTERVAL: Duration = Duration::from_secs(5);

/// Notified of `created` / `recovered` / `closed` slot transitions.
pub trait PoolEventListener: Send + Sync {
    fn created(&self, _host: &str) {}
    fn recovered(&self, _host: &str) {}
    fn closed(&self, _host: &str) {}
}

struct Slot {
    host: String,
    channel: RwLock<Option<Channel>>,
}

/// A fixed array of Channels, one per configured host.
pub struct ChannelPool {
    slots: Vec<Slot>,
    config: ClientConfig,
    revival_interval: Duration,
    listener: Option<Arc<dyn PoolEventListener>>,
}

impl ChannelPool {
    /// Connects to every host concurrently. Succeeds as soon as at least one
    /// slot becomes available within `config.connect_timeout`; the rest are
    /// picked up by the revival loop. Fails with `IllegalState` if none do.
    pub async fn connect(
        hosts: Vec<String>,
        config: ClientConfig,
        revival_interval: Duration,
        listener: Option<Arc<dyn PoolEventListener>>,
    ) -> RedisResult<Arc<ChannelPool>> {
        if hosts.is_empty() {
            return Err(RedisError::IllegalArgument(
                "channel pool requires at least one host".into(),
            ));
        }

        let attempts = futures::future::join_all(hosts.iter().cloned().map(|host| {
            let config = config.clone();
            async move {
                let on_unusable = Arc::new(|_: &str| {});
                Channel::connect(host.clone(), config, on_unusable)
                    .await
                    .ok()
            }
        }))
        .await;

        let available = attempts.iter().any(Option::is_some);
        if !available {
            return Err(RedisError::IllegalState(
                "no configured host became available within the construction timeout".into(),
            ));
        }

        let slots = hosts
            .into_iter()
            .zip(attempts)
            .map(|(host, channel)| Slot {
                host,
                channel: RwLock::new(channel),
            })
            .collect();

        let pool = Arc::new(ChannelPool {
            slots,
            config,
            revival_interval,
            listener,
        });

        for slot in &pool.slots {
            if slot.channel.read().unwrap().is_some() {
                if let Some(listener) = &pool.listener {
                    listener.created(&slot.host);
                }
            }
        }

        let revival_handle = pool.clone();
        tokio::spawn(async move { revival_handle.run_revival_loop().await });

        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn host_at(&self, index: usize) -> &str {
        &self.slots[index].host
    }

    /// True iff the channel at `index` is non-null and `Normal`.
    pub fn is_available(&self, index: usize) -> bool {
        self.slots[index]
            .channel
            .read()
            .unwrap()
            .as_ref()
            .map(Channel::is_available)
            .unwrap_or(false)
    }

    pub fn channel_at(&self, index: usize) -> Option<Channel> {
        let guard = self.slots[index].channel.read().unwrap();
        guard
            .as_ref()
            .filter(|c| c.is_available())
            .cloned()
    }

    async fn run_revival_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.revival_interval);
        loop {
            ticker.tick().await;
            for slot in &self.slots {
                let needs_revival = {
                    let guard = slot.channel.read().unwrap();
                    match guard.as_ref() {
                        Some(channel) => !channel.is_available(),
                        None => true,
                    }
                };
                if !needs_revival {
                    continue;
                }
                let was_previously_connected = slot.channel.read().unwrap().is_some();
                let on_unusable = Arc::new(|_: &str| {});
                match Channel::connect(slot.host.clone(), self.config.clone(), on_unusable).await {
                    Ok(channel) => {
                        *slot.channel.write().unwrap() = Some(channel);
                        if let Some(listener) = &self.listener {
                            if was_previously_connected {
                                listener.recovered(&slot.host);
                            } else {
                                listener.created(&slot.host);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::debug!(host = %slot.host, error = %e, "revival attempt failed");
                        if was_previously_connected {
                            *slot.channel.write().unwrap() = None;
                            if let Some(listener) = &self.listener {
                                listener.closed(&slot.host);
                            }
                        }
                    }
                }
            }
        }
    }
}
