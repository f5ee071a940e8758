//! End-to-end scenarios driven against the in-process mock server in
//! `tests/support/`.

mod support;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use naiveredis_core::channel::Channel;
use naiveredis_core::client::RedisClient;
use naiveredis_core::commands::zset::{Bound, ZAddMode};
use naiveredis_core::config::ClientConfig;
use naiveredis_core::error::RedisError;
use naiveredis_core::protocol::encode_command;
use support::MockServer;

fn test_config() -> ClientConfig {
    ClientConfig {
        ping_period: None,
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn ping_round_trips() {
    let server = MockServer::start().await;
    let client = RedisClient::connect(server.addr.clone(), test_config()).await.unwrap();
    client.keys().ping().await.unwrap();
}

#[tokio::test]
async fn add_and_get_sets_expiry_exactly_once() {
    let server = MockServer::start().await;
    let client = RedisClient::connect(server.addr.clone(), test_config()).await.unwrap();
    let counters = client.counters();

    let first = counters.add_and_get(b"k", 7, 30).await.unwrap();
    assert_eq!(first, 7);

    let second = counters.add_and_get(b"k", 5, 30).await.unwrap();
    assert_eq!(second, 12);

    // EXPIRE must have fired exactly once: on the first call, where the
    // post-increment value (7) equaled the requested delta (7).
    assert_eq!(server.expire_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn multi_get_returns_partial_results() {
    let server = MockServer::start().await;
    let client = RedisClient::connect(server.addr.clone(), test_config()).await.unwrap();
    let counters = client.counters();

    counters.incr_by(b"a", 1).await.unwrap();
    counters.incr_by(b"b", 2).await.unwrap();

    let keys = vec![Bytes::from_static(b"a"), Bytes::from_static(b"b"), Bytes::from_static(b"c")];
    let result = counters.mget(&keys).await;

    assert_eq!(result.len(), 2);
    assert_eq!(result.get(&Bytes::from_static(b"a")), Some(&1));
    assert_eq!(result.get(&Bytes::from_static(b"b")), Some(&2));
    assert_eq!(result.get(&Bytes::from_static(b"c")), None);
}

#[tokio::test]
async fn multi_get_short_circuits_on_empty_input() {
    let server = MockServer::start().await;
    let client = RedisClient::connect(server.addr.clone(), test_config()).await.unwrap();
    let result = client.counters().mget(&[]).await;
    assert!(result.is_empty());
}

#[tokio::test]
async fn sorted_set_rank_and_range_order() {
    let server = MockServer::start().await;
    let client = RedisClient::connect(server.addr.clone(), test_config()).await.unwrap();
    let zset = client.sorted_sets::<String>();

    zset.zadd(
        b"z",
        ZAddMode::Default,
        &[("m1".to_string(), 1.0), ("m2".to_string(), 2.0), ("m3".to_string(), 3.0)],
    )
    .await
    .unwrap();

    assert_eq!(zset.rank_of(b"z", &"m2".to_string(), false).await.unwrap(), Some(1));
    assert_eq!(zset.rank_of(b"z", &"m2".to_string(), true).await.unwrap(), Some(1));

    let ascending = zset.range(b"z", 0, -1, false, false).await.unwrap();
    let members: Vec<String> = ascending.into_iter().map(|(m, _)| m).collect();
    assert_eq!(members, vec!["m1", "m2", "m3"]);
}

#[tokio::test]
async fn score_range_with_exclusive_bounds() {
    let server = MockServer::start().await;
    let client = RedisClient::connect(server.addr.clone(), test_config()).await.unwrap();
    let zset = client.sorted_sets::<String>();

    zset.zadd(
        b"z",
        ZAddMode::Default,
        &[
            ("a".to_string(), 1.0),
            ("b".to_string(), 2.0),
            ("c".to_string(), 3.0),
            ("d".to_string(), 4.0),
            ("e".to_string(), 5.0),
        ],
    )
    .await
    .unwrap();

    let count = zset
        .zcount(b"z", Bound::Exclusive(1.0), Bound::Exclusive(4.0))
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn list_insertion_before_pivot_twice() {
    let server = MockServer::start().await;
    let client = RedisClient::connect(server.addr.clone(), test_config()).await.unwrap();
    let list = client.lists::<String>();

    list.rpush(
        b"l",
        &["a".to_string(), "pivot".to_string(), "pivot".to_string(), "tail".to_string()],
    )
    .await
    .unwrap();

    list.linsert(
        b"l",
        naiveredis_core::commands::list::Side::Before,
        &"pivot".to_string(),
        &"X".to_string(),
    )
    .await
    .unwrap();

    let after_first = list.lrange(b"l", 0, -1).await.unwrap();
    assert_eq!(after_first, vec!["a", "X", "pivot", "pivot", "tail"]);

    list.linsert(
        b"l",
        naiveredis_core::commands::list::Side::Before,
        &"pivot".to_string(),
        &"X".to_string(),
    )
    .await
    .unwrap();

    let after_second = list.lrange(b"l", 0, -1).await.unwrap();
    assert_eq!(after_second, vec!["a", "X", "X", "pivot", "pivot", "tail"]);
}

#[tokio::test]
async fn consecutive_timeouts_self_close_the_channel() {
    let server = MockServer::start_silent().await;
    let channel = Channel::connect(server.addr.clone(), test_config(), Arc::new(|_: &str| {}))
        .await
        .unwrap();

    let short_timeout = Duration::from_millis(15);
    for _ in 0..55 {
        if !channel.is_available() {
            break;
        }
        let payload = encode_command(&["PING"]);
        let result = channel.send(payload, short_timeout).await;
        assert!(matches!(result, Err(RedisError::Timeout(_)) | Err(RedisError::IllegalState(_))));
    }

    assert!(!channel.is_available());
}
