//! Host-facing output lifecycle.
//!
//! A [`KinesisOutput`] walks `Unconfigured → Configured → Started → Shutdown`.
//! The host calls [`format`](KinesisOutput::format) once per record and hands
//! concatenated results to [`write`](KinesisOutput::write), which drains them
//! through the stream client. Both take `&self`, so independent buffers may be
//! written from several threads once the output has started.

#[cfg(test)]
mod tests;

use std::{fmt, sync::Arc};

use log::{info, warn};
use thiserror::Error;

use crate::{
    config::{ConfigError, KinesisOptions, OutputConfig},
    dispatcher::{Dispatcher, DrainReport},
    encoder::{EncodeError, RecordEncoder},
    frame::{FrameError, encode_frame},
    key_resolver::KeyFnRegistry,
    log_record::LogRecord,
    stream_client::{ClientError, DeliveryError, KinesisClient, StreamClient},
};

/// Lifecycle state of a [`KinesisOutput`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputState {
    Unconfigured,
    Configured,
    Started,
    Shutdown,
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Started => "started",
            Self::Shutdown => "shut down",
        };
        f.write_str(name)
    }
}

/// Errors surfaced to the host by [`KinesisOutput`].
#[derive(Debug, Error)]
pub enum OutputError {
    /// Options failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A buffer or entry could not be framed.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// A record could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The configured stream could not be confirmed at startup.
    #[error("stream {stream_name:?} is not available: {source}")]
    StreamCheck {
        stream_name: String,
        #[source]
        source: DeliveryError,
    },
    /// At least one entry of a drained buffer was not delivered.
    #[error("{0}")]
    Delivery(DrainReport),
    /// The operation is not valid in the current lifecycle state.
    #[error("cannot {operation} an output that is {state}")]
    InvalidState {
        operation: &'static str,
        state: OutputState,
    },
    /// The stream client could not be constructed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

struct Running {
    config: OutputConfig,
    encoder: RecordEncoder,
    dispatcher: Dispatcher,
}

enum Stage {
    Unconfigured,
    Configured(OutputConfig),
    Started(Running),
    Shutdown,
}

/// One configured Kinesis destination.
pub struct KinesisOutput {
    stage: Stage,
}

impl Default for KinesisOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl KinesisOutput {
    /// Create an unconfigured output.
    pub fn new() -> Self {
        Self {
            stage: Stage::Unconfigured,
        }
    }

    /// Create an output that is already configured with `config`.
    pub fn with_config(config: OutputConfig) -> Self {
        Self {
            stage: Stage::Configured(config),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> OutputState {
        match self.stage {
            Stage::Unconfigured => OutputState::Unconfigured,
            Stage::Configured(_) => OutputState::Configured,
            Stage::Started(_) => OutputState::Started,
            Stage::Shutdown => OutputState::Shutdown,
        }
    }

    /// Validated configuration, once configured and until shutdown.
    pub fn config(&self) -> Option<&OutputConfig> {
        match &self.stage {
            Stage::Configured(config) => Some(config),
            Stage::Started(running) => Some(&running.config),
            Stage::Unconfigured | Stage::Shutdown => None,
        }
    }

    /// Validate `options`, resolving key functions against `registry`.
    ///
    /// On failure the output stays unconfigured.
    pub fn configure(
        &mut self,
        options: &KinesisOptions,
        registry: &KeyFnRegistry,
    ) -> Result<(), OutputError> {
        self.expect_state(OutputState::Unconfigured, "configure")?;
        let config = options.build(registry)?;
        self.stage = Stage::Configured(config);
        Ok(())
    }

    /// Connect to the configured endpoint and confirm the stream exists.
    pub fn start(&mut self) -> Result<(), OutputError> {
        let client_config = match &self.stage {
            Stage::Configured(config) => config.client.clone(),
            _ => return Err(self.invalid_state("start")),
        };
        let client = KinesisClient::new(client_config)?;
        self.start_with_client(Arc::new(client))
    }

    /// Start with a caller-supplied client.
    ///
    /// The stream must be describable through `client`; otherwise startup
    /// fails and the output stays configured.
    pub fn start_with_client(&mut self, client: Arc<dyn StreamClient>) -> Result<(), OutputError> {
        let config = match &self.stage {
            Stage::Configured(config) => config,
            _ => return Err(self.invalid_state("start")),
        };
        let stream_name = config.stream_name();
        let description = client
            .describe_stream(stream_name)
            .map_err(|source| OutputError::StreamCheck {
                stream_name: stream_name.to_owned(),
                source,
            })?;
        info!(
            "KinesisOutput started: stream {} is {} with {} shards",
            description.stream_name, description.status, description.shard_count
        );

        let config = config.clone();
        self.stage = Stage::Started(Running {
            encoder: RecordEncoder::new(config.encoder.clone()),
            dispatcher: Dispatcher::new(client),
            config,
        });
        Ok(())
    }

    /// Encode `record` into exactly one frame.
    pub fn format(&self, tag: &str, time: i64, record: LogRecord) -> Result<Vec<u8>, OutputError> {
        let running = self.running("format")?;
        let entry = running.encoder.encode(tag, time, record)?;
        Ok(encode_frame(&entry)?)
    }

    /// Deliver every frame in `buffer`.
    ///
    /// All entries are attempted even when some fail; any failure is reported
    /// as [`OutputError::Delivery`] carrying the full report.
    pub fn write(&self, buffer: &[u8]) -> Result<DrainReport, OutputError> {
        let running = self.running("write")?;
        let report = running.dispatcher.drain(buffer)?;
        if report.is_success() {
            Ok(report)
        } else {
            warn!("KinesisOutput write incomplete: {report}");
            Err(OutputError::Delivery(report))
        }
    }

    /// Release the client. Terminal; repeated calls do nothing.
    ///
    /// Taking `&mut self` guarantees no `write` is in flight.
    pub fn shutdown(&mut self) {
        if matches!(self.stage, Stage::Started(_)) {
            info!("KinesisOutput shutting down");
        }
        self.stage = Stage::Shutdown;
    }

    fn running(&self, operation: &'static str) -> Result<&Running, OutputError> {
        match &self.stage {
            Stage::Started(running) => Ok(running),
            _ => Err(self.invalid_state(operation)),
        }
    }

    fn expect_state(&self, expected: OutputState, operation: &'static str) -> Result<(), OutputError> {
        if self.state() == expected {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    fn invalid_state(&self, operation: &'static str) -> OutputError {
        OutputError::InvalidState {
            operation,
            state: self.state(),
        }
    }
}

impl fmt::Debug for KinesisOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinesisOutput")
            .field("state", &self.state())
            .field("stream_name", &self.config().map(OutputConfig::stream_name))
            .finish()
    }
}
