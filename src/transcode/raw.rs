//! Raw UTF-8 transcoder: no header, no compression. Used by the "raw"
//! string family for interop with other Redis clients that write plain
//! strings.

use bytes::Bytes;

use crate::error::{RedisError, RedisResult};

pub struct RawTranscoder;

impl RawTranscoder {
    pub fn encode(value: &str) -> Bytes {
        Bytes::copy_from_slice(value.as_bytes())
    }

    pub fn decode(bytes: &[u8]) -> RedisResult<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| RedisError::UnexpectedError(format!("non-utf8 raw value: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plain_utf8() {
        let encoded = RawTranscoder::encode("hello world");
        assert_eq!(encoded.as_ref(), b"hello world");
        assert_eq!(RawTranscoder::decode(&encoded).unwrap(), "hello world");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let bytes = [0xff, 0xfe, 0xfd];
        assert!(RawTranscoder::decode(&bytes).is_err());
    }
}
