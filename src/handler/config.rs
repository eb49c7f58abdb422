//! Settings for [`KinesisHandler`](super::KinesisHandler).

use std::time::Duration;

use crate::{rate_limited_warner::DEFAULT_WARN_INTERVAL, stream_client::BackoffPolicy};

/// Default bounded channel capacity, in frames.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Default size at which a pending chunk is flushed.
pub const DEFAULT_CHUNK_LIMIT_BYTES: usize = 1024 * 1024;
/// Default age at which a pending chunk is flushed.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
/// Default number of times a failed chunk is resubmitted.
pub const DEFAULT_RETRY_LIMIT: u32 = 5;
/// Default bound on `flush()` and `close()` waits.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// Buffering, flushing and retry settings for the handler.
#[derive(Clone, Debug)]
pub struct HandlerConfig {
    /// Frames that may wait in the channel before `handle` reports
    /// [`HandlerError::QueueFull`](super::HandlerError::QueueFull).
    pub capacity: usize,
    /// A chunk is flushed once it holds at least this many bytes.
    pub chunk_limit_bytes: usize,
    /// A non-empty chunk is flushed once it is this old.
    pub flush_interval: Duration,
    /// Resubmissions of a failed chunk before it is dropped.
    pub retry_limit: u32,
    /// Delay between resubmissions.
    pub backoff: BackoffPolicy,
    /// Upper bound on waiting for the worker in `flush()` and `close()`.
    pub flush_timeout: Duration,
    /// Minimum spacing between drop warnings.
    pub warn_interval: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            chunk_limit_bytes: DEFAULT_CHUNK_LIMIT_BYTES,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            retry_limit: DEFAULT_RETRY_LIMIT,
            backoff: BackoffPolicy::default(),
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}
