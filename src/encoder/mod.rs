//! Turning log records into [`EncodedEntry`] values.
//!
//! The encoder owns the per-output encoding settings: which synthetic fields to
//! inject, how keys are derived, and the static ordering token. It performs no
//! size checks; oversize payloads are reported by the stream client at
//! delivery time.

mod entry;


use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use thiserror::Error;

use crate::{
    key_resolver::{DerivationError, KeyDerivation},
    log_record::LogRecord,
};

pub use entry::{EncodedEntry, MAX_RECORD_PAYLOAD_BYTES};

/// Errors produced while encoding a single record.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A partition or explicit hash key function failed.
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    /// The record could not be rendered as JSON.
    #[error("failed to serialise record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Validated settings consumed by [`RecordEncoder`].
#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// Stream every entry is addressed to.
    pub stream_name: String,
    /// Inject the host tag under `__tag`.
    pub include_tag: bool,
    /// Inject the host timestamp under `__time`.
    pub include_time: bool,
    /// Partition key derivation (always present).
    pub partition_key: KeyDerivation,
    /// Explicit hash key derivation, if configured.
    pub explicit_hash_key: Option<KeyDerivation>,
    /// Static ordering token copied onto every entry.
    pub sequence_number_for_ordering: Option<String>,
}

impl EncoderConfig {
    /// Settings with both synthetic fields enabled and no optional routing.
    pub fn new(stream_name: impl Into<String>, partition_key: KeyDerivation) -> Self {
        Self {
            stream_name: stream_name.into(),
            include_tag: true,
            include_time: true,
            partition_key,
            explicit_hash_key: None,
            sequence_number_for_ordering: None,
        }
    }
}

/// Encodes records for one output.
#[derive(Clone, Debug)]
pub struct RecordEncoder {
    config: EncoderConfig,
}

impl RecordEncoder {
    /// Create an encoder from validated settings.
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode `record` emitted under `tag` at `time` (seconds since the epoch).
    ///
    /// Keys are resolved after tag and time injection, so key functions that
    /// receive the whole record see the synthetic fields too.
    pub fn encode(
        &self,
        tag: &str,
        time: i64,
        mut record: LogRecord,
    ) -> Result<EncodedEntry, EncodeError> {
        if self.config.include_tag {
            record.inject_tag(tag);
        }
        if self.config.include_time {
            record.inject_time(time);
        }

        let json = record.to_json()?;
        let partition_key = self.config.partition_key.resolve(&record)?;
        let explicit_hash_key = self
            .config
            .explicit_hash_key
            .as_ref()
            .map(|derivation| derivation.resolve(&record))
            .transpose()?;

        Ok(EncodedEntry {
            stream_name: self.config.stream_name.clone(),
            data: encode_payload(json.as_bytes()),
            partition_key,
            explicit_hash_key,
            sequence_number_for_ordering: self.config.sequence_number_for_ordering.clone(),
        })
    }
}

/// Standard base64 as a single unbroken token.
fn encode_payload(json: &[u8]) -> String {
    BASE64_STANDARD.encode(json)
}
