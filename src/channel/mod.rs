//! Channel: one multiplexed, pipelined TCP connection to one Redis host.
//! See `io_loop` for the full lifecycle/I/O-loop implementation.

mod command;
mod io_loop;

pub use command::{Command, CommandWaiter};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};

use crate::config::ClientConfig;
use crate::error::{RedisError, RedisResult};
use crate::protocol::RedisData;

const QUEUE_CAPACITY: usize = 4096;

/// Monotonic lifecycle state: `Uninitialized -> Normal -> Closed`,
/// forward progress only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    Uninitialized = 0,
    Normal = 1,
    Closed = 2,
}

impl ChannelState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ChannelState::Uninitialized,
            1 => ChannelState::Normal,
            _ => ChannelState::Closed,
        }
    }
}

/// Fired at most once, when a Channel transitions to `Closed`.
pub type UnusableCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A single multiplexed, pipelined connection to one Redis host.
///
/// Cheap to clone: every field is an `Arc` or atomic, so the handle can be
/// shared across caller threads and captured by the background I/O loop and
/// heartbeat watcher tasks to call `close()` on themselves.
#[derive(Clone)]
pub struct Channel {
    host: Arc<str>,
    state: Arc<AtomicU8>,
    sender: mpsc::Sender<Command>,
    shutdown: Arc<Notify>,
    consecutive_timeouts: Arc<AtomicU32>,
    last_timeout: Arc<StdMutex<Option<Instant>>>,
}

impl Channel {
    /// Connects to `host` ("host:port") and spawns its I/O loop.
    ///
    /// This folds construction and initialization into one async
    /// constructor: there is no externally visible `Uninitialized` handle,
    /// because nothing could have been enqueued on one anyway. A connect
    /// failure never produces a `Channel` at all — it simply returns `Err`,
    /// which is exactly how the pool already treats a revival attempt that
    /// didn't produce a slot.
    pub async fn connect(
        host: impl Into<String>,
        config: ClientConfig,
        on_unusable: UnusableCallback,
    ) -> RedisResult<Channel> {
        let host: Arc<str> = Arc::from(host.into());
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&*host))
            .await
            .map_err(|_| RedisError::IllegalState(format!("connect timed out: {host}")))?
            .map_err(RedisError::from)?;
        stream.set_nodelay(true).ok();
        if config.keep_alive {
            // Best-effort; not every platform exposes a tunable here.
            let _ = stream.set_linger(None);
        }

        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let channel = Channel {
            host: host.clone(),
            state: Arc::new(AtomicU8::new(ChannelState::Normal as u8)),
            sender,
            shutdown: Arc::new(Notify::new()),
            consecutive_timeouts: Arc::new(AtomicU32::new(0)),
            last_timeout: Arc::new(StdMutex::new(None)),
        };

        crate::metrics::record_socket_created(&host);

        let loop_handle = channel.clone();
        let (read_half, write_half) = stream.into_split();
        tokio::spawn(io_loop::run(
            loop_handle,
            receiver,
            read_half,
            write_half,
            config,
            on_unusable,
        ));

        Ok(channel)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_available(&self) -> bool {
        self.state() == ChannelState::Normal
    }

    /// Idempotent. Signals the I/O loop to stop; the loop itself drains the
    /// send-queue and in-flight FIFO, fires the unusable callback, and drops
    /// the socket halves. See the module doc for why teardown is performed
    /// by the loop rather than synchronously here.
    pub fn close(&self) {
        let previous = self
            .state
            .swap(ChannelState::Closed as u8, Ordering::AcqRel);
        if previous == ChannelState::Closed as u8 {
            return;
        }
        self.shutdown.notify_waiters();
    }

    /// Enqueues `payload` and waits up to `timeout` for its response.
    ///
    /// A RESP `Error` frame is converted to `RedisError::RedisServerError`
    /// here, before the command layer above ever sees the raw frame — this
    /// is the only layer that sees both the raw frame and the caller's
    /// waiting future, so it is the natural place to do the conversion.
    pub async fn send(&self, payload: Bytes, timeout: Duration) -> RedisResult<RedisData> {
        if !self.is_available() {
            return Err(RedisError::IllegalState(format!(
                "channel {} is closed",
                self.host
            )));
        }
        let (command, waiter) = Command::new(payload);
        if self.sender.send(command).await.is_err() {
            return Err(RedisError::IllegalState(format!(
                "channel {} is closed",
                self.host
            )));
        }

        match waiter.wait(timeout).await {
            Ok(RedisData::Error(text)) => Err(RedisError::RedisServerError(text)),
            Ok(frame) => {
                self.reset_consecutive_timeouts();
                Ok(frame)
            }
            Err(RedisError::Timeout(d)) => {
                self.record_timeout();
                Err(RedisError::Timeout(d))
            }
            Err(other) => Err(other),
        }
    }

    fn reset_consecutive_timeouts(&self) {
        self.consecutive_timeouts.store(0, Ordering::Relaxed);
    }

    /// Consecutive-timeout policy: two timeouts within one
    /// second bump the counter; past 50 the channel self-closes.
    fn record_timeout(&self) {
        let now = Instant::now();
        let mut last = self.last_timeout.lock().unwrap();
        let consecutive = match *last {
            Some(previous) if now.duration_since(previous) < Duration::from_secs(1) => {
                self.consecutive_timeouts.fetch_add(1, Ordering::SeqCst) + 1
            }
            _ => {
                self.consecutive_timeouts.store(1, Ordering::SeqCst);
                1
            }
        };
        *last = Some(now);
        drop(last);

        if consecutive > 50 {
            tracing::warn!(
                host = %self.host,
                consecutive,
                "consecutive timeout threshold exceeded, self-closing channel"
            );
            self.close();
        }
    }

    pub(crate) fn shutdown_signal(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    pub(crate) fn mark_closed(&self) {
        self.state.store(ChannelState::Closed as u8, Ordering::AcqRel);
    }
}

/// The I/O loop's private in-flight bookkeeping, split out so `io_loop::run`
/// stays readable.
pub(crate) struct InFlight {
    pub queue: VecDeque<Command>,
}

impl InFlight {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}
