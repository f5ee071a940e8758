//! Opaque value transcoder: header + optional LZF compression + bincode.

use bytes::{Bytes, BytesMut};
use serde::{de::DeserializeOwned, Serialize};

use super::compression::{self, CompressionTag};
use super::MAGIC;
use crate::config::ClientConfig;
use crate::error::{RedisError, RedisResult};

/// Header layout: `[magic, reserved, compression_tag, reserved]` (4 bytes),
/// followed by the (possibly compressed) bincode payload. When the
/// compression tag is set, the header is followed by a 4-byte little-endian
/// `u32` giving the exact length of the bincode payload before compression —
/// raw LZF carries no length of its own, so decode needs it to size the
/// decompression buffer precisely rather than guess.
pub struct OpaqueTranscoder {
    compression_threshold: usize,
}

impl OpaqueTranscoder {
    pub fn new(compression_threshold: usize) -> Self {
        Self {
            compression_threshold,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.compression_threshold)
    }

    /// Serializes `value`, compressing with LZF if the serialized payload
    /// exceeds the configured threshold. Returns the encoded bytes and the
    /// number of bytes the compression stage saved (0 if not compressed).
    pub fn encode<T: Serialize>(&self, value: &T) -> RedisResult<(Bytes, i64)> {
        let serialized = bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| RedisError::UnexpectedError(format!("serialization failed: {e}")))?;

        if serialized.len() > self.compression_threshold {
            let (compressed, saved) = compression::compress(&serialized)?;
            let mut buf = BytesMut::with_capacity(8 + compressed.len());
            buf.extend_from_slice(&[MAGIC, 0, CompressionTag::Lzf as u8, 0]);
            buf.extend_from_slice(&(serialized.len() as u32).to_le_bytes());
            buf.extend_from_slice(&compressed);
            Ok((buf.freeze(), saved))
        } else {
            let mut buf = BytesMut::with_capacity(4 + serialized.len());
            buf.extend_from_slice(&[MAGIC, 0, CompressionTag::None as u8, 0]);
            buf.extend_from_slice(&serialized);
            Ok((buf.freeze(), 0))
        }
    }

    /// Decodes a payload previously produced by [`Self::encode`].
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> RedisResult<T> {
        if bytes.len() < 4 {
            return Err(RedisError::UnexpectedError(
                "payload shorter than transcoder header".into(),
            ));
        }
        if bytes[0] != MAGIC {
            return Err(RedisError::UnexpectedError(format!(
                "bad transcoder magic byte: {:#x}",
                bytes[0]
            )));
        }
        let tag = CompressionTag::from_byte(bytes[2])?;

        let plain = match tag {
            CompressionTag::None => bytes[4..].to_vec(),
            CompressionTag::Lzf => {
                if bytes.len() < 8 {
                    return Err(RedisError::UnexpectedError(
                        "compressed payload shorter than length prefix".into(),
                    ));
                }
                let original_len =
                    u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
                compression::decompress(&bytes[8..], original_len)?
            }
        };

        let (value, _len) = bincode::serde::decode_from_slice(&plain, bincode::config::standard())
            .map_err(|e| RedisError::UnexpectedError(format!("deserialization failed: {e}")))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        id: u64,
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn round_trips_small_value_uncompressed() {
        let transcoder = OpaqueTranscoder::new(64 * 1024);
        let value = Sample {
            id: 7,
            name: "widget".into(),
            tags: vec!["a".into(), "b".into()],
        };
        let (bytes, saved) = transcoder.encode(&value).unwrap();
        assert_eq!(saved, 0);
        assert_eq!(bytes[0], MAGIC);
        assert_eq!(bytes[2], CompressionTag::None as u8);
        let decoded: Sample = transcoder.decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn round_trips_large_value_compressed() {
        let transcoder = OpaqueTranscoder::new(16);
        let value = Sample {
            id: 1,
            name: "x".repeat(4096),
            tags: vec!["y".repeat(512); 8],
        };
        let (bytes, saved) = transcoder.encode(&value).unwrap();
        assert_eq!(bytes[2], CompressionTag::Lzf as u8);
        assert!(saved > 0);
        let decoded: Sample = transcoder.decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn round_trips_highly_repetitive_value_past_the_threshold() {
        // 100_000 identical bytes compresses far better than 8:1, which is
        // exactly the ratio that broke a length-guessing decompress.
        let transcoder = OpaqueTranscoder::new(64 * 1024);
        let value = Sample {
            id: 1,
            name: "a".repeat(100_000),
            tags: vec![],
        };
        let (bytes, saved) = transcoder.encode(&value).unwrap();
        assert_eq!(bytes[2], CompressionTag::Lzf as u8);
        assert!(saved > 0);
        let decoded: Sample = transcoder.decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn rejects_bad_magic() {
        let transcoder = OpaqueTranscoder::new(64 * 1024);
        let bad = [0u8, 0, 0, 0, 1, 2, 3];
        let result: RedisResult<Sample> = transcoder.decode(&bad);
        assert!(matches!(result, Err(RedisError::UnexpectedError(_))));
    }

    #[test]
    fn rejects_short_payload() {
        let transcoder = OpaqueTranscoder::new(64 * 1024);
        let result: RedisResult<Sample> = transcoder.decode(&[MAGIC]);
        assert!(result.is_err());
    }
}
