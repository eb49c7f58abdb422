//! Draining frame buffers into the stream client.
//!
//! Each frame becomes one `put_record` call. A delivery failure is recorded
//! against its entry and the drain moves on, so one bad record never hides the
//! rest of the batch. Malformed framing is different: the remaining bytes
//! cannot be trusted, so the drain stops and reports a [`FrameError`].
//!
//! The dispatcher never retries. Per-request retries belong to the client and
//! whole-batch resubmission to the host.

use std::{fmt, sync::Arc};

use log::{debug, warn};

use crate::{
    frame::{FrameError, Frames},
    stream_client::{DeliveryError, StreamClient},
};

/// A single entry that could not be delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryFailure {
    /// Position of the entry within the drained buffer.
    pub index: usize,
    /// Partition key the entry was routed with.
    pub partition_key: String,
    /// Why delivery failed.
    pub error: DeliveryError,
}

/// Aggregate outcome of one drain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries submitted to the client.
    pub attempted: usize,
    /// Entries the client accepted.
    pub delivered: usize,
    /// Entries the client failed to deliver, in buffer order.
    pub failures: Vec<EntryFailure>,
}

impl DrainReport {
    /// Whether every entry was delivered.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failed entries.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every failure may succeed when the batch is resubmitted.
    pub fn all_retryable(&self) -> bool {
        self.failures.iter().all(|failure| failure.error.is_retryable())
    }
}

impl fmt::Display for DrainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} records failed delivery",
            self.failed(),
            self.attempted
        )?;
        if let Some(first) = self.failures.first() {
            write!(f, " (first: entry {}: {})", first.index, first.error)?;
        }
        Ok(())
    }
}

/// Submit every frame in `buffer` through `client`.
///
/// Entries submitted before a framing error stay submitted; the error is
/// returned in place of the report.
pub fn drain(buffer: &[u8], client: &dyn StreamClient) -> Result<DrainReport, FrameError> {
    let mut report = DrainReport::default();

    for (index, frame) in Frames::new(buffer).enumerate() {
        let entry = match frame {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    "Dispatcher aborted drain after submitting {} records: {err}",
                    report.attempted
                );
                return Err(err);
            }
        };

        report.attempted += 1;
        match client.put_record(&entry) {
            Ok(output) => {
                debug!(
                    "Dispatcher delivered entry {index} to {} at {}",
                    output.shard_id, output.sequence_number
                );
                report.delivered += 1;
            }
            Err(error) => {
                debug!("Dispatcher failed to deliver entry {index}: {error}");
                report.failures.push(EntryFailure {
                    index,
                    partition_key: entry.partition_key,
                    error,
                });
            }
        }
    }

    Ok(report)
}

/// Drains buffers through a shared client.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn StreamClient>,
}

impl Dispatcher {
    /// Create a dispatcher around `client`.
    pub fn new(client: Arc<dyn StreamClient>) -> Self {
        Self { client }
    }

    /// Client used for delivery.
    pub fn client(&self) -> &Arc<dyn StreamClient> {
        &self.client
    }

    /// Submit every frame in `buffer`. See [`drain`].
    pub fn drain(&self, buffer: &[u8]) -> Result<DrainReport, FrameError> {
        drain(buffer, self.client.as_ref())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        encoder::{EncodedEntry, MAX_RECORD_PAYLOAD_BYTES},
        frame::FrameBuffer,
        test_utils::RecordingClient,
    };

    fn entry(partition_key: &str, data: String) -> EncodedEntry {
        EncodedEntry {
            stream_name: "events".into(),
            data,
            partition_key: partition_key.into(),
            explicit_hash_key: None,
            sequence_number_for_ordering: None,
        }
    }

    fn buffer_of(entries: &[EncodedEntry]) -> Vec<u8> {
        let mut buffer = FrameBuffer::new();
        for entry in entries {
            buffer.append(entry).expect("append");
        }
        buffer.into_bytes()
    }

    #[rstest]
    fn delivers_every_entry_in_order() {
        let client = RecordingClient::new();
        let entries = vec![entry("a", "e30=".into()), entry("b", "e30=".into())];

        let report = drain(&buffer_of(&entries), &client).expect("drain");

        assert!(report.is_success());
        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(client.delivered(), entries);
    }

    #[rstest]
    fn oversize_entry_is_isolated() {
        let client = RecordingClient::new();
        let entries = vec![
            entry("small-1", "e30=".into()),
            entry("big", "A".repeat(MAX_RECORD_PAYLOAD_BYTES + 4)),
            entry("small-2", "e30=".into()),
        ];

        let report = drain(&buffer_of(&entries), &client).expect("drain");

        assert!(!report.is_success());
        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.index, 1);
        assert_eq!(failure.partition_key, "big");
        assert!(matches!(
            failure.error,
            DeliveryError::PayloadTooLarge { .. }
        ));
        assert!(!report.all_retryable());
        assert_eq!(client.put_calls(), 3);
    }

    #[rstest]
    fn rejected_entries_do_not_stop_the_drain() {
        let client = RecordingClient::new().reject_partition_key("bad");
        let entries = vec![
            entry("bad", "e30=".into()),
            entry("good", "e30=".into()),
            entry("bad", "e30=".into()),
        ];

        let report = drain(&buffer_of(&entries), &client).expect("drain");

        assert_eq!(report.delivered, 1);
        let indices: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
        assert_eq!(indices, [0, 2]);
        assert_eq!(
            report.to_string(),
            "2 of 3 records failed delivery (first: entry 0: stream service returned 400 \
             ValidationException: partition key bad rejected)"
        );
    }

    #[rstest]
    fn transient_failures_are_reported_as_retryable() {
        let client = RecordingClient::new();
        client.fail_next_puts(1);

        let report = drain(&buffer_of(&[entry("a", "e30=".into())]), &client).expect("drain");

        assert_eq!(report.failed(), 1);
        assert!(report.all_retryable());
    }

    #[rstest]
    fn malformed_tail_aborts_after_valid_frames() {
        let client = RecordingClient::new();
        let mut bytes = buffer_of(&[entry("a", "e30=".into())]);
        bytes.extend_from_slice(&[1, 2, 3]);

        let err = drain(&bytes, &client).expect_err("malformed tail");

        assert!(matches!(err, FrameError::TruncatedPrefix { remaining: 3, .. }));
        assert_eq!(client.delivered().len(), 1);
    }

    #[rstest]
    fn empty_buffer_is_a_successful_no_op() {
        let client = RecordingClient::new();
        let dispatcher = Dispatcher::new(Arc::new(client.clone()));
        let report = dispatcher.drain(&[]).expect("drain");
        assert_eq!(report, DrainReport::default());
        assert_eq!(client.put_calls(), 0);
    }
}
