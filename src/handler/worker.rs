//! Background worker that batches frames into chunks and writes them.

use std::{
    mem,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded};
use log::{debug, warn};

use super::{HandlerError, config::HandlerConfig};
use crate::{
    output::{KinesisOutput, OutputError},
    rate_limited_warner::RateLimitedWarner,
    stream_client::backoff::BackoffState,
};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub(super) enum Command {
    Frame(Vec<u8>),
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

/// Set once `close` has run out of time; the worker stops resubmitting.
pub(super) type AbandonFlag = Arc<AtomicBool>;

pub(super) fn spawn_worker(
    output: Arc<KinesisOutput>,
    config: HandlerConfig,
    abandon: AbandonFlag,
) -> (Sender<Command>, thread::JoinHandle<()>) {
    let (tx, rx) = bounded(config.capacity);
    let handle = thread::spawn(move || Worker::new(output, config, abandon).run(rx));
    (tx, handle)
}

struct Worker {
    output: Arc<KinesisOutput>,
    config: HandlerConfig,
    chunk: Vec<u8>,
    frames: usize,
    opened_at: Option<Instant>,
    warner: RateLimitedWarner,
    abandon: AbandonFlag,
}

impl Worker {
    fn new(output: Arc<KinesisOutput>, config: HandlerConfig, abandon: AbandonFlag) -> Self {
        let warner = RateLimitedWarner::new(config.warn_interval);
        Self {
            output,
            config,
            chunk: Vec::new(),
            frames: 0,
            opened_at: None,
            warner,
            abandon,
        }
    }

    fn run(mut self, rx: Receiver<Command>) {
        loop {
            let received = match self.flush_deadline() {
                Some(deadline) => rx.recv_deadline(deadline),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(Command::Frame(frame)) => self.append(frame),
                Ok(Command::Flush(ack)) => {
                    self.flush_chunk();
                    let _ = ack.send(());
                }
                Ok(Command::Shutdown(ack)) => {
                    self.drain_pending(&rx);
                    self.flush_chunk();
                    let _ = ack.send(());
                    break;
                }
                Err(RecvTimeoutError::Timeout) => self.flush_chunk(),
                Err(RecvTimeoutError::Disconnected) => {
                    self.flush_chunk();
                    break;
                }
            }
        }
        self.warner.flush(|count| {
            warn!("KinesisHandler dropped {count} records in the last interval");
        });
    }

    fn flush_deadline(&self) -> Option<Instant> {
        self.opened_at.map(|opened| opened + self.config.flush_interval)
    }

    fn append(&mut self, frame: Vec<u8>) {
        if !self.chunk.is_empty() && self.chunk.len() + frame.len() > self.config.chunk_limit_bytes
        {
            self.flush_chunk();
        }
        if self.chunk.is_empty() {
            self.opened_at = Some(Instant::now());
        }
        self.chunk.extend_from_slice(&frame);
        self.frames += 1;
        if self.chunk.len() >= self.config.chunk_limit_bytes {
            self.flush_chunk();
        }
    }

    fn drain_pending(&mut self, rx: &Receiver<Command>) {
        loop {
            match rx.try_recv() {
                Ok(Command::Frame(frame)) => self.append(frame),
                Ok(Command::Flush(ack)) | Ok(Command::Shutdown(ack)) => {
                    let _ = ack.send(());
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn flush_chunk(&mut self) {
        self.opened_at = None;
        if self.chunk.is_empty() {
            return;
        }
        let chunk = mem::take(&mut self.chunk);
        let frames = mem::take(&mut self.frames);
        let undelivered = self.deliver(&chunk, frames);
        if undelivered > 0 {
            self.warner.record_drops(undelivered as u64);
            self.warner.warn_if_due(|count| {
                warn!("KinesisHandler dropped {count} records after failed delivery");
            });
        }
    }

    /// Write `chunk`, resubmitting it whole while failures are retryable.
    ///
    /// Returns how many records the last attempt left undelivered.
    fn deliver(&self, chunk: &[u8], frames: usize) -> usize {
        let mut backoff = BackoffState::new(self.config.backoff.clone());
        let mut attempt: u32 = 0;
        loop {
            let report = match self.output.write(chunk) {
                Ok(report) => {
                    debug!(
                        "KinesisHandler delivered chunk of {} records ({} bytes)",
                        report.delivered,
                        chunk.len()
                    );
                    return 0;
                }
                Err(OutputError::Delivery(report)) => report,
                Err(err) => {
                    warn!("KinesisHandler cannot deliver chunk of {frames} records: {err}");
                    return frames;
                }
            };

            if !report.all_retryable() {
                warn!("KinesisHandler chunk rejected: {report}");
                return report.failed();
            }
            if attempt >= self.config.retry_limit {
                warn!("KinesisHandler giving up after {attempt} retries: {report}");
                return report.failed();
            }
            if self.abandon.load(Ordering::Acquire) {
                warn!("KinesisHandler close timed out; abandoning retries: {report}");
                return report.failed();
            }
            let Some(delay) = backoff.next_sleep(Instant::now()) else {
                warn!("KinesisHandler retry deadline exceeded: {report}");
                return report.failed();
            };
            attempt += 1;
            warn!("KinesisHandler resubmitting chunk (retry {attempt}) after {report}");
            thread::sleep(delay);
        }
    }
}

/// Enqueue one frame without blocking.
pub(super) fn enqueue_frame(
    tx: &Sender<Command>,
    frame: Vec<u8>,
    warner: &RateLimitedWarner,
) -> Result<(), HandlerError> {
    match tx.try_send(Command::Frame(frame)) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            warner.record_drop();
            warner.warn_if_due(|count| {
                warn!("KinesisHandler queue full; dropped {count} records");
            });
            Err(HandlerError::QueueFull)
        }
        Err(TrySendError::Disconnected(_)) => {
            warner.record_drop();
            warner.warn_if_due(|count| {
                warn!("KinesisHandler disconnected; dropped {count} records");
            });
            Err(HandlerError::Closed)
        }
    }
}

/// Send `command` carrying a fresh ack channel and wait for the worker.
///
/// The whole exchange is bounded by `timeout`.
pub(super) fn round_trip(
    tx: &Sender<Command>,
    command: impl FnOnce(Sender<()>) -> Command,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    let (ack_tx, ack_rx) = bounded(1);
    if tx.send_timeout(command(ack_tx), timeout).is_err() {
        return false;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    ack_rx.recv_timeout(remaining).is_ok()
}
