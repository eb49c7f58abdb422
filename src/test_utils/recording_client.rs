//! In-memory [`StreamClient`] that records what it is asked to deliver.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    encoder::{EncodedEntry, MAX_RECORD_PAYLOAD_BYTES},
    stream_client::{DeliveryError, PutRecordOutput, StreamClient, StreamDescription},
};

#[derive(Default)]
struct Inner {
    delivered: Mutex<Vec<EncodedEntry>>,
    streams: Mutex<Option<HashSet<String>>>,
    rejected_keys: Mutex<HashSet<String>>,
    transient_failures: AtomicUsize,
    put_calls: AtomicUsize,
    describe_calls: AtomicUsize,
}

/// Client double that behaves like the service for the cases tests care
/// about: unknown streams, oversize payloads, rejected keys and transient
/// failures.
///
/// Clones share state, so a test can keep one handle while the output owns
/// another.
#[derive(Clone, Default)]
pub struct RecordingClient {
    inner: Arc<Inner>,
}

impl RecordingClient {
    /// A client for which every stream exists and every record is accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict existing streams to those registered with this method.
    pub fn with_stream(self, name: &str) -> Self {
        self.inner
            .streams
            .lock()
            .get_or_insert_with(HashSet::new)
            .insert(name.to_owned());
        self
    }

    /// Reject every record routed with `partition_key`.
    pub fn reject_partition_key(self, partition_key: &str) -> Self {
        self.inner
            .rejected_keys
            .lock()
            .insert(partition_key.to_owned());
        self
    }

    /// Fail the next `count` puts with a transport error.
    pub fn fail_next_puts(&self, count: usize) {
        self.inner
            .transient_failures
            .store(count, Ordering::SeqCst);
    }

    /// Entries accepted so far, in submission order.
    pub fn delivered(&self) -> Vec<EncodedEntry> {
        self.inner.delivered.lock().clone()
    }

    /// Number of `put_record` calls, successful or not.
    pub fn put_calls(&self) -> usize {
        self.inner.put_calls.load(Ordering::SeqCst)
    }

    /// Number of `describe_stream` calls.
    pub fn describe_calls(&self) -> usize {
        self.inner.describe_calls.load(Ordering::SeqCst)
    }

    fn take_transient_failure(&self) -> bool {
        self.inner
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl StreamClient for RecordingClient {
    fn describe_stream(&self, stream_name: &str) -> Result<StreamDescription, DeliveryError> {
        self.inner.describe_calls.fetch_add(1, Ordering::SeqCst);
        let known = self
            .inner
            .streams
            .lock()
            .as_ref()
            .is_none_or(|streams| streams.contains(stream_name));
        if !known {
            return Err(DeliveryError::Rejected {
                status: 400,
                error_type: "ResourceNotFoundException".into(),
                message: format!("Stream {stream_name} not found"),
            });
        }
        Ok(StreamDescription {
            stream_name: stream_name.to_owned(),
            status: "ACTIVE".into(),
            shard_count: 1,
        })
    }

    fn put_record(&self, entry: &EncodedEntry) -> Result<PutRecordOutput, DeliveryError> {
        let call = self.inner.put_calls.fetch_add(1, Ordering::SeqCst);
        if entry.exceeds_payload_limit() {
            return Err(DeliveryError::PayloadTooLarge {
                size: entry.payload_len(),
                limit: MAX_RECORD_PAYLOAD_BYTES,
            });
        }
        if self.take_transient_failure() {
            return Err(DeliveryError::Transport("injected failure".into()));
        }
        if self.inner.rejected_keys.lock().contains(&entry.partition_key) {
            return Err(DeliveryError::Rejected {
                status: 400,
                error_type: "ValidationException".into(),
                message: format!("partition key {} rejected", entry.partition_key),
            });
        }
        self.inner.delivered.lock().push(entry.clone());
        Ok(PutRecordOutput {
            shard_id: "shardId-000000000000".into(),
            sequence_number: call.to_string(),
        })
    }
}
