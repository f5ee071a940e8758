//! Value transcoder: opaque value ⇄ byte payload, plus the raw UTF-8
//! variant used for interop with other Redis clients.

mod compression;
mod opaque;
mod raw;

pub use compression::CompressionTag;
pub use opaque::OpaqueTranscoder;
pub use raw::RawTranscoder;

/// Leading magic byte of every opaque-transcoder payload.
/// Changing it is a wire-incompatible break.
pub const MAGIC: u8 = 0x29;
