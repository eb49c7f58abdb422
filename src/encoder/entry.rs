//! The unit handed to the stream client.

use serde::{Deserialize, Serialize};

/// Maximum size of a record's data blob accepted by the stream service.
pub const MAX_RECORD_PAYLOAD_BYTES: usize = 50 * 1024;

/// A routing-annotated, base64-encoded log record ready for `PutRecord`.
///
/// Optional routing fields are skipped entirely when absent, both in frames
/// and on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedEntry {
    /// Target stream.
    pub stream_name: String,
    /// Standard base64 of the record's JSON text, without line breaks.
    pub data: String,
    /// Key used by the service to pick a shard.
    pub partition_key: String,
    /// Optional override of partition-key hashing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_hash_key: Option<String>,
    /// Optional ordering token passed through to the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number_for_ordering: Option<String>,
}

impl EncodedEntry {
    /// Size of the data blob in bytes.
    pub fn payload_len(&self) -> usize {
        self.data.len()
    }

    /// Whether the data blob exceeds [`MAX_RECORD_PAYLOAD_BYTES`].
    pub fn exceeds_payload_limit(&self) -> bool {
        self.payload_len() > MAX_RECORD_PAYLOAD_BYTES
    }
}
