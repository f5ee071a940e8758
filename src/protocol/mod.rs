//! RESP wire protocol: frame commands, parse responses.

mod resp;

pub use resp::{encode_command, parse_frame, RedisData};
