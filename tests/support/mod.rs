//! A minimal in-process Redis stand-in for integration tests: accepts one
//! TCP connection, parses RESP command frames with the crate's own codec,
//! and answers just enough of the wire protocol to drive the end-to-end
//! test scenarios below.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use naiveredis_core::protocol::{parse_frame, RedisData};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

#[derive(Default)]
struct State {
    strings: HashMap<String, Vec<u8>>,
    lists: HashMap<String, VecDeque<Vec<u8>>>,
    zsets: HashMap<String, BTreeMap<String, f64>>,
}

/// A running mock server. Drop it (or let it go out of scope) to stop
/// accepting new connections; in-flight ones keep running until the
/// listener task is aborted by the runtime shutdown.
pub struct MockServer {
    pub addr: String,
    pub expire_calls: Arc<AtomicUsize>,
}

pub fn encode_frame(frame: &RedisData) -> BytesMut {
    let mut buf = BytesMut::new();
    write_frame(&mut buf, frame);
    buf
}

fn write_frame(buf: &mut BytesMut, frame: &RedisData) {
    match frame {
        RedisData::SimpleString(s) => {
            buf.put_u8(b'+');
            buf.put_slice(s.as_bytes());
            buf.put_slice(b"\r\n");
        }
        RedisData::Error(s) => {
            buf.put_u8(b'-');
            buf.put_slice(s.as_bytes());
            buf.put_slice(b"\r\n");
        }
        RedisData::Integer(n) => {
            buf.put_u8(b':');
            buf.put_slice(n.to_string().as_bytes());
            buf.put_slice(b"\r\n");
        }
        RedisData::BulkString(None) => buf.put_slice(b"$-1\r\n"),
        RedisData::BulkString(Some(bytes)) => {
            buf.put_u8(b'$');
            buf.put_slice(bytes.len().to_string().as_bytes());
            buf.put_slice(b"\r\n");
            buf.put_slice(bytes);
            buf.put_slice(b"\r\n");
        }
        RedisData::Array(None) => buf.put_slice(b"*-1\r\n"),
        RedisData::Array(Some(items)) => {
            buf.put_u8(b'*');
            buf.put_slice(items.len().to_string().as_bytes());
            buf.put_slice(b"\r\n");
            for item in items {
                write_frame(buf, item);
            }
        }
    }
}

fn bulk(s: impl Into<Vec<u8>>) -> RedisData {
    RedisData::BulkString(Some(bytes::Bytes::from(s.into())))
}

fn nil_bulk() -> RedisData {
    RedisData::BulkString(None)
}

fn ok() -> RedisData {
    RedisData::SimpleString("OK".into())
}

fn handle(state: &mut State, expire_calls: &AtomicUsize, args: &[Vec<u8>]) -> RedisData {
    let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
    let arg = |i: usize| String::from_utf8_lossy(&args[i]).to_string();

    match name.as_str() {
        "PING" => RedisData::SimpleString("PONG".into()),
        "SET" => {
            state.strings.insert(arg(1), args[2].clone());
            ok()
        }
        "GET" => match state.strings.get(&arg(1)) {
            Some(v) => bulk(v.clone()),
            None => nil_bulk(),
        },
        "MGET" => RedisData::Array(Some(
            args[1..]
                .iter()
                .map(|k| match state.strings.get(&String::from_utf8_lossy(k).to_string()) {
                    Some(v) => bulk(v.clone()),
                    None => nil_bulk(),
                })
                .collect(),
        )),
        "INCRBY" => {
            let key = arg(1);
            let delta: i64 = arg(2).parse().unwrap();
            let current: i64 = state
                .strings
                .get(&key)
                .map(|v| String::from_utf8_lossy(v).parse().unwrap_or(0))
                .unwrap_or(0);
            let next = current + delta;
            state.strings.insert(key, next.to_string().into_bytes());
            RedisData::Integer(next)
        }
        "EXPIRE" => {
            expire_calls.fetch_add(1, Ordering::SeqCst);
            RedisData::Integer(1)
        }
        "DEL" => {
            let existed = state.strings.remove(&arg(1)).is_some();
            RedisData::Integer(existed as i64)
        }
        "EXISTS" => RedisData::Integer(state.strings.contains_key(&arg(1)) as i64),
        "LPUSH" | "RPUSH" => {
            let key = arg(1);
            let list = state.lists.entry(key).or_default();
            for v in &args[2..] {
                if name == "LPUSH" {
                    list.push_front(v.clone());
                } else {
                    list.push_back(v.clone());
                }
            }
            RedisData::Integer(list.len() as i64)
        }
        "LINSERT" => {
            let key = arg(1);
            let before = arg(2).eq_ignore_ascii_case("BEFORE");
            let pivot = args[3].clone();
            let value = args[4].clone();
            let list = state.lists.entry(key).or_default();
            match list.iter().position(|v| *v == pivot) {
                Some(idx) => {
                    let insert_at = if before { idx } else { idx + 1 };
                    list.insert(insert_at, value);
                    RedisData::Integer(list.len() as i64)
                }
                None => RedisData::Integer(-1),
            }
        }
        "LRANGE" => {
            let list = state.lists.entry(arg(1)).or_default();
            let items: Vec<RedisData> = list.iter().map(|v| bulk(v.clone())).collect();
            RedisData::Array(Some(items))
        }
        "LLEN" => RedisData::Integer(state.lists.get(&arg(1)).map(|l| l.len()).unwrap_or(0) as i64),
        "ZADD" => {
            let key = arg(1);
            let mut idx = 2;
            if args[idx].eq_ignore_ascii_case(b"CH") || args[idx].eq_ignore_ascii_case(b"NX") || args[idx].eq_ignore_ascii_case(b"XX") {
                idx += 1;
            }
            let set = state.zsets.entry(key).or_default();
            let mut added = 0;
            while idx + 1 < args.len() {
                let score: f64 = arg(idx).parse().unwrap();
                let member = arg(idx + 1);
                if set.insert(member, score).is_none() {
                    added += 1;
                }
                idx += 2;
            }
            RedisData::Integer(added)
        }
        "ZRANK" | "ZREVRANK" => {
            let set = state.zsets.entry(arg(1)).or_default();
            let member = arg(2);
            let mut sorted: Vec<(&String, &f64)> = set.iter().collect();
            sorted.sort_by(|a, b| a.1.partial_cmp(b.1).unwrap());
            if name == "ZREVRANK" {
                sorted.reverse();
            }
            match sorted.iter().position(|(m, _)| **m == member) {
                Some(rank) => RedisData::Integer(rank as i64),
                None => nil_bulk(),
            }
        }
        "ZRANGE" | "ZREVRANGE" => {
            let set = state.zsets.entry(arg(1)).or_default();
            let mut sorted: Vec<(String, f64)> = set.iter().map(|(m, s)| (m.clone(), *s)).collect();
            sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
            if name == "ZREVRANGE" {
                sorted.reverse();
            }
            let items: Vec<RedisData> = sorted.into_iter().map(|(m, _)| bulk(m)).collect();
            RedisData::Array(Some(items))
        }
        "ZCOUNT" => {
            let set = state.zsets.entry(arg(1)).or_default();
            let min = parse_bound(&arg(2));
            let max = parse_bound(&arg(3));
            let count = set
                .values()
                .filter(|&&score| within(score, min) && within(score, max))
                .count();
            RedisData::Integer(count as i64)
        }
        other => RedisData::Error(format!("ERR unknown command '{other}'")),
    }
}

#[derive(Clone, Copy)]
enum ParsedBound {
    Min(f64, bool),
    Max(f64, bool),
}

fn parse_bound(s: &str) -> ParsedBound {
    if let Some(rest) = s.strip_prefix('(') {
        if rest == "-inf" {
            ParsedBound::Min(f64::NEG_INFINITY, true)
        } else if rest == "+inf" {
            ParsedBound::Max(f64::INFINITY, true)
        } else {
            ParsedBound::Min(rest.parse().unwrap(), true)
        }
    } else if s == "-inf" {
        ParsedBound::Min(f64::NEG_INFINITY, false)
    } else if s == "+inf" {
        ParsedBound::Max(f64::INFINITY, false)
    } else {
        ParsedBound::Min(s.parse().unwrap(), false)
    }
}

fn within(score: f64, bound: ParsedBound) -> bool {
    match bound {
        ParsedBound::Min(v, exclusive) => {
            if exclusive {
                score > v
            } else {
                score >= v
            }
        }
        ParsedBound::Max(v, exclusive) => {
            if exclusive {
                score < v
            } else {
                score <= v
            }
        }
    }
}

impl MockServer {
    pub async fn start() -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let expire_calls = Arc::new(AtomicUsize::new(0));
        let expire_calls_task = expire_calls.clone();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut state = State::default();
            loop {
                let frame = match parse_frame(&mut reader).await {
                    Ok(frame) => frame,
                    Err(_) => break,
                };
                let args = match frame {
                    RedisData::Array(Some(items)) => items
                        .into_iter()
                        .filter_map(|item| match item {
                            RedisData::BulkString(Some(b)) => Some(b.to_vec()),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                    _ => break,
                };
                if args.is_empty() {
                    continue;
                }
                let response = handle(&mut state, &expire_calls_task, &args);
                let encoded = encode_frame(&response);
                if write_half.write_all(&encoded).await.is_err() {
                    break;
                }
                if write_half.flush().await.is_err() {
                    break;
                }
            }
        });

        MockServer { addr, expire_calls }
    }

    /// A server that never responds — drives the consecutive-timeout
    /// self-close test below.
    pub async fn start_silent() -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            // Read and discard forever; never write a response.
            let (read_half, _write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            loop {
                if parse_frame(&mut reader).await.is_err() {
                    break;
                }
            }
        });
        MockServer {
            addr,
            expire_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}
