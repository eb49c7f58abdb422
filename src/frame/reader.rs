//! Read side of the framing layer.

use std::iter::FusedIterator;

use rmp_serde::Deserializer;
use serde::Deserialize;

use super::{FrameError, LENGTH_PREFIX_BYTES};
use crate::encoder::EncodedEntry;

/// Lazy, left-to-right decoder over a frame buffer.
///
/// The reader keeps a cursor into immutable bytes and advances it past each
/// decoded frame. It cannot be rewound. The first malformed frame is yielded
/// as an error and the iterator then stops.
#[derive(Debug)]
pub struct Frames<B> {
    bytes: B,
    offset: usize,
    done: bool,
}

impl<B: AsRef<[u8]>> Frames<B> {
    /// Start decoding `bytes` from the first frame.
    pub fn new(bytes: B) -> Self {
        Self {
            bytes,
            offset: 0,
            done: false,
        }
    }

    /// Offset of the next frame.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.as_ref().len().saturating_sub(self.offset)
    }

    fn read_frame(&mut self) -> Result<EncodedEntry, FrameError> {
        let offset = self.offset;
        let buf = &self.bytes.as_ref()[offset..];
        let Some((prefix, rest)) = buf.split_first_chunk::<LENGTH_PREFIX_BYTES>() else {
            return Err(FrameError::TruncatedPrefix {
                offset,
                remaining: buf.len(),
            });
        };

        let declared = u32::from_le_bytes(*prefix) as usize;
        let Some(body) = rest.get(..declared) else {
            return Err(FrameError::TruncatedBody {
                offset,
                declared,
                remaining: rest.len(),
            });
        };

        let mut unread: &[u8] = body;
        let entry = EncodedEntry::deserialize(&mut Deserializer::new(&mut unread))
            .map_err(|source| FrameError::Decode { offset, source })?;
        if !unread.is_empty() {
            return Err(FrameError::TrailingBytes {
                offset,
                extra: unread.len(),
            });
        }
        self.offset = offset + LENGTH_PREFIX_BYTES + declared;
        Ok(entry)
    }
}

impl<B: AsRef<[u8]>> Iterator for Frames<B> {
    type Item = Result<EncodedEntry, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining() == 0 {
            self.done = true;
            return None;
        }
        let frame = self.read_frame();
        if frame.is_err() {
            self.done = true;
        }
        Some(frame)
    }
}

impl<B: AsRef<[u8]>> FusedIterator for Frames<B> {}

/// Decode every frame in `bytes`, failing on the first malformed one.
pub fn decode_frames(bytes: &[u8]) -> Result<Vec<EncodedEntry>, FrameError> {
    Frames::new(bytes).collect()
}
