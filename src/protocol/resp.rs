//! RESP framing and parsing.
//!
//! Commands are always framed as an array of bulk strings; responses can be
//! any of the five RESP frame kinds, including nested arrays (e.g. GEORADIUS
//! WITHCOORD replies).

use std::future::Future;
use std::pin::Pin;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{RedisError, RedisResult};

/// A single RESP response frame.
///
/// `nil` bulk strings and `nil` arrays are distinct from empty ones — both
/// are represented here, never collapsed to an empty `Vec`.
#[derive(Debug, Clone, PartialEq)]
pub enum RedisData {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Option<Bytes>),
    Array(Option<Vec<RedisData>>),
}

impl RedisData {
    pub fn as_error(&self) -> Option<&str> {
        match self {
            RedisData::Error(s) => Some(s),
            _ => None,
        }
    }
}

/// Serializes a command as `*<count>\r\n($<len>\r\n<bytes>\r\n)*`.
///
/// Every argument is framed as a bulk string, including numeric ones, which
/// are rendered as their decimal ASCII form first.
pub fn encode_command<A>(args: &[A]) -> Bytes
where
    A: AsRef<[u8]>,
{
    let mut buf = BytesMut::with_capacity(args.iter().map(|a| a.as_ref().len() + 16).sum());
    buf.put_slice(b"*");
    buf.put_slice(args.len().to_string().as_bytes());
    buf.put_slice(b"\r\n");
    for arg in args {
        let bytes = arg.as_ref();
        buf.put_slice(b"$");
        buf.put_slice(bytes.len().to_string().as_bytes());
        buf.put_slice(b"\r\n");
        buf.put_slice(bytes);
        buf.put_slice(b"\r\n");
    }
    buf.freeze()
}

const MAX_LEN: i64 = i32::MAX as i64;

async fn read_line<R>(reader: &mut R) -> RedisResult<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = reader
        .read_until(b'\n', &mut line)
        .await
        .map_err(RedisError::from)?;
    if n == 0 {
        return Err(RedisError::UnexpectedError("connection closed".into()));
    }
    // strip trailing \r\n
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(line)
}

async fn read_line_str<R>(reader: &mut R) -> RedisResult<String>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    String::from_utf8(line)
        .map_err(|e| RedisError::UnexpectedError(format!("non-utf8 frame text: {e}")))
}

async fn read_integer_line<R>(reader: &mut R) -> RedisResult<i64>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line_str(reader).await?;
    line.parse::<i64>()
        .map_err(|_| RedisError::UnexpectedError(format!("invalid integer frame: {line:?}")))
}

async fn read_length<R>(reader: &mut R) -> RedisResult<i64>
where
    R: AsyncBufRead + Unpin,
{
    let n = read_integer_line(reader).await?;
    if n < -1 {
        return Err(RedisError::UnexpectedError(format!(
            "negative length not equal to -1: {n}"
        )));
    }
    if n > MAX_LEN {
        return Err(RedisError::UnexpectedError(format!(
            "length out of i32 range: {n}"
        )));
    }
    Ok(n)
}

/// Parses exactly one top-level frame from `reader`.
///
/// Recursive (arrays nest), so the future is boxed to make the recursion
/// possible in stable `async fn`.
pub fn parse_frame<'a, R>(
    reader: &'a mut R,
) -> Pin<Box<dyn Future<Output = RedisResult<RedisData>> + Send + 'a>>
where
    R: AsyncBufRead + Unpin + Send,
{
    Box::pin(async move {
        let mut tag = [0u8; 1];
        let n = reader.read(&mut tag).await.map_err(RedisError::from)?;
        if n == 0 {
            return Err(RedisError::UnexpectedError("connection closed".into()));
        }
        match tag[0] {
            b'+' => Ok(RedisData::SimpleString(read_line_str(reader).await?)),
            b'-' => Ok(RedisData::Error(read_line_str(reader).await?)),
            b':' => Ok(RedisData::Integer(read_integer_line(reader).await?)),
            b'$' => {
                let len = read_length(reader).await?;
                if len == -1 {
                    return Ok(RedisData::BulkString(None));
                }
                let mut buf = vec![0u8; len as usize];
                reader.read_exact(&mut buf).await.map_err(RedisError::from)?;
                let mut crlf = [0u8; 2];
                reader.read_exact(&mut crlf).await.map_err(RedisError::from)?;
                if crlf != [b'\r', b'\n'] {
                    return Err(RedisError::UnexpectedError(
                        "malformed bulk string terminator".into(),
                    ));
                }
                Ok(RedisData::BulkString(Some(Bytes::from(buf))))
            }
            b'*' => {
                let len = read_length(reader).await?;
                if len == -1 {
                    return Ok(RedisData::Array(None));
                }
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    items.push(parse_frame(reader).await?);
                }
                Ok(RedisData::Array(Some(items)))
            }
            other => Err(RedisError::UnexpectedError(format!(
                "unknown RESP type tag: {}",
                other as char
            ))),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn encodes_array_of_bulk_strings() {
        let bytes = encode_command(&["SET", "k", "v"]);
        assert_eq!(bytes.as_ref(), b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n");
    }

    async fn parse(input: &[u8]) -> RedisResult<RedisData> {
        let mut reader = BufReader::new(input);
        parse_frame(&mut reader).await
    }

    #[tokio::test]
    async fn parses_simple_string() {
        assert_eq!(
            parse(b"+OK\r\n").await.unwrap(),
            RedisData::SimpleString("OK".into())
        );
    }

    #[tokio::test]
    async fn parses_error() {
        assert_eq!(
            parse(b"-ERR bad\r\n").await.unwrap(),
            RedisData::Error("ERR bad".into())
        );
    }

    #[tokio::test]
    async fn parses_integer() {
        assert_eq!(parse(b":42\r\n").await.unwrap(), RedisData::Integer(42));
    }

    #[tokio::test]
    async fn parses_nil_bulk_string() {
        assert_eq!(
            parse(b"$-1\r\n").await.unwrap(),
            RedisData::BulkString(None)
        );
    }

    #[tokio::test]
    async fn parses_bulk_string() {
        assert_eq!(
            parse(b"$5\r\nhello\r\n").await.unwrap(),
            RedisData::BulkString(Some(Bytes::from_static(b"hello")))
        );
    }

    #[tokio::test]
    async fn distinguishes_nil_from_empty_bulk_string() {
        assert_eq!(
            parse(b"$0\r\n\r\n").await.unwrap(),
            RedisData::BulkString(Some(Bytes::new()))
        );
    }

    #[tokio::test]
    async fn parses_nil_array() {
        assert_eq!(parse(b"*-1\r\n").await.unwrap(), RedisData::Array(None));
    }

    #[tokio::test]
    async fn parses_nested_array() {
        let input = b"*2\r\n*2\r\n:1\r\n:2\r\n$3\r\nfoo\r\n";
        let parsed = parse(input).await.unwrap();
        assert_eq!(
            parsed,
            RedisData::Array(Some(vec![
                RedisData::Array(Some(vec![
                    RedisData::Integer(1),
                    RedisData::Integer(2),
                ])),
                RedisData::BulkString(Some(Bytes::from_static(b"foo"))),
            ]))
        );
    }

    #[tokio::test]
    async fn eof_mid_frame_is_connection_closed_error() {
        let err = parse(b"$5\r\nhel").await.unwrap_err();
        assert!(matches!(err, RedisError::UnexpectedError(_)));
    }

    #[tokio::test]
    async fn eof_before_any_byte_is_connection_closed_error() {
        let err = parse(b"").await.unwrap_err();
        match err {
            RedisError::UnexpectedError(msg) => assert!(msg.contains("closed")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
