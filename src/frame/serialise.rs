//! MessagePack serialisation of frame bodies.

use rmp_serde::Serializer;
use serde::Serialize;

use super::{FrameError, LENGTH_PREFIX_BYTES};
use crate::encoder::EncodedEntry;

/// Encode `entry` as a single standalone frame.
pub fn encode_frame(entry: &EncodedEntry) -> Result<Vec<u8>, FrameError> {
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_BYTES + entry.data.len() + 64);
    write_frame(&mut frame, entry)?;
    Ok(frame)
}

/// Append one frame for `entry` to `out`.
///
/// On failure `out` is truncated back to its original length, so a buffer is
/// never left holding a partial frame.
pub(super) fn write_frame(out: &mut Vec<u8>, entry: &EncodedEntry) -> Result<(), FrameError> {
    let start = out.len();
    out.extend_from_slice(&[0; LENGTH_PREFIX_BYTES]);

    let body_start = out.len();
    let result = serialise_body(out, entry).and_then(|()| {
        let size = out.len() - body_start;
        u32::try_from(size).map_err(|_| FrameError::TooLarge { size })
    });

    match result {
        Ok(len) => {
            out[start..body_start].copy_from_slice(&len.to_le_bytes());
            Ok(())
        }
        Err(err) => {
            out.truncate(start);
            Err(err)
        }
    }
}

fn serialise_body(out: &mut Vec<u8>, entry: &EncodedEntry) -> Result<(), FrameError> {
    let mut serializer = Serializer::new(out).with_struct_map();
    entry.serialize(&mut serializer)?;
    Ok(())
}
