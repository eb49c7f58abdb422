//! Client side of the stream ingestion service.
//!
//! [`StreamClient`] is the seam between the dispatcher and the network. The
//! shipped implementation, [`KinesisClient`], speaks the Kinesis JSON protocol
//! over blocking HTTP, signs every request with AWS Signature Version 4 and
//! retries transient failures with jittered exponential backoff.
//!
//! # Retry Semantics
//!
//! - **2xx**: success.
//! - **429, 5xx, throttling error types**: retryable, backoff until deadline.
//! - **Other 4xx**: permanent, reported immediately.
//! - **Transport errors**: retryable.
//! - **Oversize data**: permanent, reported without a request.

pub(crate) mod backoff;
mod config;
mod kinesis;
pub(crate) mod signing;


use serde::Deserialize;
use thiserror::Error;

use crate::encoder::EncodedEntry;

pub use config::{
    BackoffPolicy, ClientConfig, Credentials, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP,
    DEFAULT_BACKOFF_DEADLINE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
pub use kinesis::KinesisClient;
pub(crate) use kinesis::{ResponseClass, classify_response};

/// Failure to deliver or query a single record or stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The record's data blob is larger than the service accepts.
    #[error("record data of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    /// The service answered with a non-success status.
    #[error("stream service returned {status} {error_type}: {message}")]
    Rejected {
        status: u16,
        error_type: String,
        message: String,
    },
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response could not be understood.
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl DeliveryError {
    /// Whether trying the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected {
                status, error_type, ..
            } => classify_response(*status, error_type) == ResponseClass::Retryable,
            Self::PayloadTooLarge { .. } | Self::Malformed(_) => false,
        }
    }
}

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The TLS backend could not be initialised.
    #[error("failed to initialise TLS: {0}")]
    Tls(#[from] native_tls::Error),
    /// The endpoint is not an `http://` or `https://` URL with a host.
    #[error("invalid endpoint {0:?}")]
    Endpoint(String),
}

/// Summary of a stream returned by `DescribeStream`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDescription {
    pub stream_name: String,
    pub status: String,
    pub shard_count: usize,
}

/// Placement of a record accepted by `PutRecord`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRecordOutput {
    pub shard_id: String,
    pub sequence_number: String,
}

/// Network client for the ingestion service.
///
/// Implementations must be safe to share between threads: independent buffers
/// may be drained concurrently through one client.
pub trait StreamClient: Send + Sync {
    /// Check that `stream_name` exists and describe it.
    fn describe_stream(&self, stream_name: &str) -> Result<StreamDescription, DeliveryError>;

    /// Submit one entry.
    fn put_record(&self, entry: &EncodedEntry) -> Result<PutRecordOutput, DeliveryError>;
}
