//! LZF compression stage of the opaque transcoder.

use crate::error::{RedisError, RedisResult};

/// The one-byte compression tag carried in the transcoder header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionTag {
    None = 0,
    Lzf = 1,
}

impl CompressionTag {
    pub fn from_byte(b: u8) -> RedisResult<Self> {
        match b {
            0 => Ok(CompressionTag::None),
            1 => Ok(CompressionTag::Lzf),
            other => Err(RedisError::UnexpectedError(format!(
                "unknown compression tag: {other}"
            ))),
        }
    }
}

/// Compresses `payload` with LZF. Returns the compressed bytes and the
/// number of bytes saved (may be negative for incompressible payloads —
/// callers decide whether to keep the compressed form).
pub fn compress(payload: &[u8]) -> RedisResult<(Vec<u8>, i64)> {
    let compressed = lzf::compress(payload)
        .map_err(|e| RedisError::UnexpectedError(format!("lzf compression failed: {e:?}")))?;
    let saved = payload.len() as i64 - compressed.len() as i64;
    Ok((compressed, saved))
}

/// Decompresses an LZF payload. Raw LZF carries no length of its own, so
/// `original_len` must be the exact size of the data `compress` was given —
/// a guessed/oversized bound works, but any undersized bound makes
/// `lzf::decompress` fail with `BufferTooSmall` on data we produced
/// ourselves, which is why callers persist the exact length rather than
/// estimating it from the compressed size.
pub fn decompress(payload: &[u8], original_len: usize) -> RedisResult<Vec<u8>> {
    lzf::decompress(payload, original_len)
        .map_err(|e| RedisError::UnexpectedError(format!("lzf decompression failed: {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_compressible_payload() {
        let payload = vec![b'a'; 4096];
        let (compressed, saved) = compress(&payload).unwrap();
        assert!(saved > 0);
        let decompressed = decompress(&compressed, payload.len()).unwrap();
        assert_eq!(decompressed, payload);
    }
}
