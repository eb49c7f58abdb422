//! Buffered log output for Amazon Kinesis Data Streams.
//!
//! Records are encoded into routed entries ([`encoder`]), written as
//! length-prefixed frames ([`frame`]), and later drained one `PutRecord` call
//! per frame ([`dispatcher`]) through a [`StreamClient`]. [`KinesisOutput`]
//! exposes that pipeline as a host lifecycle; [`KinesisHandler`] adds
//! background chunking for applications without a host buffer.

pub mod config;
pub mod dispatcher;
pub mod encoder;
pub mod frame;
pub mod handler;
pub mod key_resolver;
pub mod log_record;
pub mod output;
pub mod rate_limited_warner;
pub mod stream_client;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use config::{ConfigError, KinesisOptions, OutputConfig};
pub use dispatcher::{Dispatcher, DrainReport, EntryFailure};
pub use encoder::{EncodeError, EncodedEntry, EncoderConfig, MAX_RECORD_PAYLOAD_BYTES, RecordEncoder};
pub use frame::{FrameBuffer, FrameError, Frames};
pub use handler::{HandlerConfig, HandlerError, KinesisHandler};
pub use key_resolver::{DerivationError, KeyDerivation, KeyFn, KeyFnRegistry};
pub use log_record::LogRecord;
pub use output::{KinesisOutput, OutputError, OutputState};
pub use stream_client::{
    BackoffPolicy, ClientConfig, ClientError, Credentials, DeliveryError, KinesisClient,
    PutRecordOutput, StreamClient, StreamDescription,
};
