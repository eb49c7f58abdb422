//! Write side of the framing layer.

use super::{FrameError, Frames, serialise::write_frame};
use crate::encoder::EncodedEntry;

/// Contiguous buffer of complete frames.
///
/// The buffer exclusively owns its bytes until it is handed to the reader with
/// [`into_frames`](Self::into_frames) or to the host with
/// [`into_bytes`](Self::into_bytes).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    bytes: Vec<u8>,
    frames: usize,
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            frames: 0,
        }
    }

    /// Append one frame holding `entry`.
    pub fn append(&mut self, entry: &EncodedEntry) -> Result<(), FrameError> {
        write_frame(&mut self.bytes, entry)?;
        self.frames += 1;
        Ok(())
    }

    /// Total size in bytes, prefixes included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no frame has been appended.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of frames appended.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Borrow the raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Release the raw frame bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Consume the buffer into a lazy frame reader.
    pub fn into_frames(self) -> Frames<Vec<u8>> {
        Frames::new(self.bytes)
    }
}

impl AsRef<[u8]> for FrameBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
