//! Property tests for frame buffers: every appended entry comes back, in order,
//! and a truncated buffer yields only whole entries before it stops.

use femtokinesis::{
    EncodedEntry, FrameBuffer, FrameError,
    frame::{Frames, decode_frames},
};
use proptest::{collection::vec, option, prelude::*};

fn entry_strategy() -> impl Strategy<Value = EncodedEntry> {
    (
        "[a-z][a-z0-9-]{0,15}",
        "[A-Za-z0-9+/]{0,64}",
        "\\PC{0,32}",
        option::of("[0-9]{1,38}"),
        option::of("[0-9]{1,20}"),
    )
        .prop_map(
            |(stream_name, data, partition_key, explicit_hash_key, sequence_number_for_ordering)| {
                EncodedEntry {
                    stream_name,
                    data,
                    partition_key,
                    explicit_hash_key,
                    sequence_number_for_ordering,
                }
            },
        )
}

proptest! {
    #[test]
    fn frames_preserve_entries_and_order(entries in vec(entry_strategy(), 0..24)) {
        let mut buffer = FrameBuffer::new();
        for entry in &entries {
            buffer.append(entry).expect("append");
        }
        prop_assert_eq!(buffer.frame_count(), entries.len());
        prop_assert_eq!(decode_frames(buffer.as_bytes()).expect("decode"), entries);
    }

    #[test]
    fn truncated_buffers_yield_a_clean_prefix(
        entries in vec(entry_strategy(), 1..8),
        cut in 1usize..64,
    ) {
        let mut buffer = FrameBuffer::new();
        for entry in &entries {
            buffer.append(entry).expect("append");
        }
        let bytes = buffer.into_bytes();
        let keep = bytes.len().saturating_sub(cut);

        let mut frames = Frames::new(&bytes[..keep]);
        let mut decoded = Vec::new();
        for frame in frames.by_ref() {
            match frame {
                Ok(entry) => decoded.push(entry),
                Err(FrameError::TruncatedPrefix { .. } | FrameError::TruncatedBody { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }
        prop_assert!(decoded.len() < entries.len());
        prop_assert_eq!(&decoded[..], &entries[..decoded.len()]);
        prop_assert!(frames.next().is_none());
    }
}
