//! The `Command` object: a request carrying a frozen byte payload
//! and a single-assignment completion slot.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::{RedisError, RedisResult};
use crate::protocol::RedisData;

/// A request enqueued on a [`super::Channel`].
///
/// Created by a caller, enqueued, consumed by exactly one I/O loop, and
/// completed exactly once — by that loop on success, by that loop's close
/// path on shutdown, or (for the synthesized heartbeat) by the loop as well.
/// The oneshot channel is the single-assignment slot: a second `complete`
/// attempt is simply a no-op send into a closed receiver.
pub struct Command {
    payload: Bytes,
    completion: oneshot::Sender<RedisResult<RedisData>>,
}

/// The caller-side half of a [`Command`]: the handle awaited inside `send()`.
pub struct CommandWaiter {
    completion: oneshot::Receiver<RedisResult<RedisData>>,
}

impl Command {
    /// Freezes `payload` into a new Command/waiter pair.
    pub fn new(payload: Bytes) -> (Command, CommandWaiter) {
        let (tx, rx) = oneshot::channel();
        (
            Command {
                payload,
                completion: tx,
            },
            CommandWaiter { completion: rx },
        )
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Completes this Command. Consumes `self` — once the FIFO head is
    /// popped and completed, the slot can never be written again.
    pub fn complete(self, result: RedisResult<RedisData>) {
        // Caller may have already given up (timed out); a dropped receiver
        // just means the response becomes wasted garbage.
        let _ = self.completion.send(result);
    }
}

impl CommandWaiter {
    /// Awaits completion for up to `timeout`. A completed send whose result
    /// carries a RESP `Error` frame is not converted here — that is
    /// `Channel::send`'s job, since only it knows to fold it into
    /// `RedisError::RedisServerError`.
    pub async fn wait(self, timeout: Duration) -> RedisResult<RedisData> {
        match tokio::time::timeout(timeout, self.completion).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RedisError::UnexpectedError(
                "command dropped before completion".into(),
            )),
            Err(_) => Err(RedisError::Timeout(timeout)),
        }
    }
}
