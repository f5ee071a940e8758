//! The single reader/writer task per Channel.

use bytes::BytesMut;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use super::{Channel, Command, InFlight, UnusableCallback};
use crate::config::ClientConfig;
use crate::error::RedisError;
use crate::protocol::{encode_command, parse_frame, RedisData};

enum Event {
    Cmd(Command),
    SenderClosed,
    Heartbeat,
    Shutdown,
}

async fn next_event(
    receiver: &mut mpsc::Receiver<Command>,
    shutdown: &tokio::sync::Notify,
    ping_period: Option<std::time::Duration>,
) -> Event {
    match ping_period {
        Some(interval) => {
            tokio::select! {
                biased;
                _ = shutdown.notified() => Event::Shutdown,
                cmd = receiver.recv() => match cmd {
                    Some(c) => Event::Cmd(c),
                    None => Event::SenderClosed,
                },
                _ = tokio::time::sleep(interval) => Event::Heartbeat,
            }
        }
        None => {
            tokio::select! {
                biased;
                _ = shutdown.notified() => Event::Shutdown,
                cmd = receiver.recv() => match cmd {
                    Some(c) => Event::Cmd(c),
                    None => Event::SenderClosed,
                },
            }
        }
    }
}

/// Appends `cmd`'s payload to the merge buffer (or writes it straight
/// through if it alone meets/exceeds the buffer capacity), then pushes
/// `cmd` onto the in-flight FIFO.
async fn buffer_or_write(
    cmd: Command,
    merge_buf: &mut BytesMut,
    write_half: &mut OwnedWriteHalf,
    in_flight: &mut InFlight,
    capacity: usize,
) -> Result<(), RedisError> {
    if cmd.payload().len() >= capacity {
        flush(merge_buf, write_half).await?;
        write_half.write_all(cmd.payload()).await?;
        write_half.flush().await?;
    } else {
        if merge_buf.len() + cmd.payload().len() > capacity {
            flush(merge_buf, write_half).await?;
        }
        if cmd.payload().len() > capacity - merge_buf.len() {
            // The merge buffer was just flushed and is empty; a payload
            // smaller than capacity must fit. Anything else is a bug.
            return Err(RedisError::UnexpectedError(
                "payload does not fit empty merge buffer".into(),
            ));
        }
        merge_buf.extend_from_slice(cmd.payload());
    }
    in_flight.queue.push_back(cmd);
    Ok(())
}

async fn flush(merge_buf: &mut BytesMut, write_half: &mut OwnedWriteHalf) -> Result<(), RedisError> {
    if !merge_buf.is_empty() {
        write_half.write_all(merge_buf).await?;
        write_half.flush().await?;
        merge_buf.clear();
    }
    Ok(())
}

fn spawn_heartbeat_watcher(channel: Channel, waiter: super::CommandWaiter) {
    tokio::spawn(async move {
        let host = channel.host().to_string();
        match waiter.wait(std::time::Duration::from_secs(5)).await {
            Ok(RedisData::SimpleString(s)) if s == "PONG" => {}
            _ => {
                crate::metrics::record_heartbeat_failure(&host);
                tracing::warn!(host = %host, "heartbeat PING did not get PONG, closing channel");
                channel.close();
            }
        }
    });
}

pub(crate) async fn run(
    channel: Channel,
    mut receiver: mpsc::Receiver<Command>,
    read_half: OwnedReadHalf,
    mut write_half: OwnedWriteHalf,
    config: ClientConfig,
    on_unusable: UnusableCallback,
) {
    let mut reader = BufReader::with_capacity(config.receive_buffer_size, read_half);
    let mut merge_buf = BytesMut::with_capacity(config.send_buffer_size);
    let mut in_flight = InFlight::new();
    let shutdown = channel.shutdown_signal();

    let result: Result<(), RedisError> = 'outer: loop {
        match next_event(&mut receiver, &shutdown, config.ping_period).await {
            Event::Shutdown | Event::SenderClosed => break Ok(()),
            Event::Heartbeat => {
                let ping = encode_command(&["PING"]);
                let (cmd, waiter) = Command::new(ping);
                spawn_heartbeat_watcher(channel.clone(), waiter);
                if let Err(e) = buffer_or_write(
                    cmd,
                    &mut merge_buf,
                    &mut write_half,
                    &mut in_flight,
                    config.send_buffer_size,
                )
                .await
                {
                    break 'outer Err(e);
                }
            }
            Event::Cmd(cmd) => {
                if let Err(e) = buffer_or_write(
                    cmd,
                    &mut merge_buf,
                    &mut write_half,
                    &mut in_flight,
                    config.send_buffer_size,
                )
                .await
                {
                    break 'outer Err(e);
                }
            }
        }

        // Step 4: drain whatever else is already queued without blocking.
        loop {
            match receiver.try_recv() {
                Ok(cmd) => {
                    if let Err(e) = buffer_or_write(
                        cmd,
                        &mut merge_buf,
                        &mut write_half,
                        &mut in_flight,
                        config.send_buffer_size,
                    )
                    .await
                    {
                        break 'outer Err(e);
                    }
                }
                Err(_) => break,
            }
        }

        if let Err(e) = flush(&mut merge_buf, &mut write_half).await {
            break 'outer Err(e);
        }

        // Step 5: one frame per in-flight command, FIFO order.
        while !in_flight.queue.is_empty() {
            let frame = match parse_frame(&mut reader).await {
                Ok(frame) => frame,
                Err(e) => break 'outer Err(e),
            };
            let head = in_flight
                .queue
                .pop_front()
                .expect("checked non-empty above");
            head.complete(Ok(frame));
        }
    };

    if let Err(e) = &result {
        tracing::warn!(host = %channel.host(), error = %e, "channel I/O loop exiting on error");
    }

    shut_down(channel, receiver, in_flight, on_unusable).await;
}

async fn shut_down(
    channel: Channel,
    mut receiver: mpsc::Receiver<Command>,
    mut in_flight: InFlight,
    on_unusable: UnusableCallback,
) {
    channel.mark_closed();
    receiver.close();

    let closed_err = || RedisError::IllegalState(format!("channel {} is closed", channel.host()));

    while let Some(cmd) = in_flight.queue.pop_front() {
        cmd.complete(Err(closed_err()));
    }
    while let Ok(cmd) = receiver.try_recv() {
        cmd.complete(Err(closed_err()));
    }

    crate::metrics::record_socket_closed(channel.host());
    on_unusable(channel.host());
}
