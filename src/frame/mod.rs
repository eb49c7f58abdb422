//! Length-prefixed framing of encoded entries.
//!
//! A buffer is a concatenation of frames. Each frame is a 4-byte unsigned
//! little-endian length followed by exactly that many bytes of MessagePack
//! (named-field map) holding one [`EncodedEntry`](crate::encoder::EncodedEntry).
//! There is no padding, no header and no trailing partial frame. This layout is
//! shared with anything that persists or replays buffers, so both the width
//! and the byte order of the prefix are fixed.

mod buffer;
mod reader;
mod serialise;


use thiserror::Error;

pub use buffer::FrameBuffer;
pub use reader::{Frames, decode_frames};
pub use serialise::encode_frame;

/// Width of the length prefix in bytes.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Errors raised while writing or reading frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Fewer than four bytes remained where a length prefix was expected.
    #[error("truncated length prefix at offset {offset}: only {remaining} bytes remain")]
    TruncatedPrefix { offset: usize, remaining: usize },
    /// The length prefix claims more bytes than the buffer holds.
    #[error("frame at offset {offset} declares {declared} bytes but only {remaining} remain")]
    TruncatedBody {
        offset: usize,
        declared: usize,
        remaining: usize,
    },
    /// The frame body is not a valid entry.
    #[error("failed to decode frame at offset {offset}: {source}")]
    Decode {
        offset: usize,
        #[source]
        source: rmp_serde::decode::Error,
    },
    /// The frame body holds bytes beyond its single entry.
    #[error("frame at offset {offset} has {extra} bytes after its entry")]
    TrailingBytes { offset: usize, extra: usize },
    /// The entry could not be serialised.
    #[error("failed to encode entry: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    /// The serialised entry does not fit a 32-bit length prefix.
    #[error("serialised entry of {size} bytes does not fit a frame")]
    TooLarge { size: usize },
}
