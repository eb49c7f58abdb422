//! Buffered, background delivery on top of [`KinesisOutput`].
//!
//! [`KinesisHandler`] plays the host's part for applications that do not have
//! one: records are formatted on the caller's thread, queued as frames, and a
//! worker thread concatenates them into chunks that are written when they grow
//! past `chunk_limit_bytes`, when they reach `flush_interval` of age, or on
//! [`flush`](KinesisHandler::flush) and [`close`](KinesisHandler::close).
//!
//! A chunk whose delivery fails with only retryable errors is resubmitted whole
//! (already-accepted entries are sent again) up to `retry_limit` times. Chunks
//! that still fail are dropped with a rate-limited warning.

mod config;
mod worker;


use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    log_record::LogRecord,
    output::{KinesisOutput, OutputError, OutputState},
    rate_limited_warner::RateLimitedWarner,
};

pub use config::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CHUNK_LIMIT_BYTES, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_FLUSH_TIMEOUT, DEFAULT_RETRY_LIMIT, HandlerConfig,
};
use worker::{AbandonFlag, Command, enqueue_frame, round_trip, spawn_worker};

/// Errors returned by [`KinesisHandler::handle`].
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The queue is at capacity; the record was dropped.
    #[error("handler queue is full")]
    QueueFull,
    /// The handler has been closed; the record was dropped.
    #[error("handler is closed")]
    Closed,
    /// The record could not be formatted, or the output was not usable.
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Handler shipping records to a stream from a background thread.
pub struct KinesisHandler {
    output: Arc<KinesisOutput>,
    tx: Option<Sender<Command>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    warner: RateLimitedWarner,
    abandon: AbandonFlag,
    config: HandlerConfig,
}

impl KinesisHandler {
    /// Wrap a started `output`.
    pub fn new(output: KinesisOutput, config: HandlerConfig) -> Result<Self, HandlerError> {
        let state = output.state();
        if state != OutputState::Started {
            return Err(OutputError::InvalidState {
                operation: "buffer",
                state,
            }
            .into());
        }
        let output = Arc::new(output);
        let abandon = Arc::new(AtomicBool::new(false));
        let (tx, handle) = spawn_worker(Arc::clone(&output), config.clone(), Arc::clone(&abandon));
        Ok(Self {
            output,
            tx: Some(tx),
            handle: Mutex::new(Some(handle)),
            warner: RateLimitedWarner::new(config.warn_interval),
            abandon,
            config,
        })
    }

    /// Format `record` and queue it for delivery.
    pub fn handle(&self, tag: &str, time: i64, record: LogRecord) -> Result<(), HandlerError> {
        let Some(tx) = self.tx.as_ref() else {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                log::warn!("KinesisHandler dropped {count} records after shutdown");
            });
            return Err(HandlerError::Closed);
        };
        let frame = self.output.format(tag, time, record)?;
        enqueue_frame(tx, frame, &self.warner)
    }

    /// Write the pending chunk now and wait for it to finish.
    ///
    /// Returns `false` if the handler is closed or the worker did not answer
    /// within the configured flush timeout.
    pub fn flush(&self) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        self.warner.flush(|count| {
            log::warn!("KinesisHandler dropped {count} records in the last interval");
        });
        round_trip(tx, Command::Flush, self.config.flush_timeout)
    }

    /// Deliver pending frames, stop the worker and shut the output down.
    ///
    /// If the worker has not finished within `flush_timeout`, it is told to
    /// stop resubmitting; `close` then waits only for the write in flight.
    pub fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            if !round_trip(&tx, Command::Shutdown, self.config.flush_timeout) {
                self.abandon.store(true, Ordering::Release);
                log::warn!(
                    "KinesisHandler: worker did not acknowledge shutdown within {:?}; \
                     abandoning retries",
                    self.config.flush_timeout
                );
            }
        }
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            log::warn!("KinesisHandler: worker thread panicked");
        }
        match Arc::get_mut(&mut self.output) {
            Some(output) => output.shutdown(),
            None => log::warn!("KinesisHandler: output still shared; skipping shutdown"),
        }
    }

    /// Lifecycle state of the wrapped output.
    pub fn output_state(&self) -> OutputState {
        self.output.state()
    }
}

impl Drop for KinesisHandler {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for KinesisHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KinesisHandler")
            .field("output", &self.output)
            .field("open", &self.tx.is_some())
            .finish()
    }
}
