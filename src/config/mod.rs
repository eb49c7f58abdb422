//! Output configuration.
//!
//! [`KinesisOptions`] mirrors the option surface an operator writes (every
//! value optional, strings parsed leniently). [`KinesisOptions::build`]
//! validates it against a [`KeyFnRegistry`](crate::key_resolver::KeyFnRegistry)
//! and produces an immutable [`OutputConfig`]. All configuration errors surface
//! here, before an output can start.

mod ini_file;
mod options;


use thiserror::Error;

use crate::{encoder::EncoderConfig, stream_client::ClientConfig};

pub use options::KinesisOptions;

/// Errors that may occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required option was not supplied.
    #[error("'{0}' is required")]
    Missing(&'static str),
    /// Neither a partition key field nor a partition key function was given.
    #[error("'partition_key' or 'partition_key_proc' is required")]
    MissingPartitionKey,
    /// A `*_proc` option names a function that is not registered.
    #[error("{option} names unregistered key function {name:?}")]
    UnknownKeyFunction { option: &'static str, name: String },
    /// An option key is not recognised.
    #[error("unknown option: {0}")]
    UnknownOption(String),
    /// An option value could not be parsed or is out of range.
    #[error("invalid value {value:?} for {option}: {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
    /// A configuration file could not be read or parsed.
    #[error("failed to load configuration from {source_name}: {message}")]
    Ini {
        source_name: String,
        message: String,
    },
    /// The requested section is absent from a configuration file.
    #[error("missing configuration section [{0}]")]
    MissingSection(String),
}

/// Validated configuration for one output.
#[derive(Clone, Debug)]
pub struct OutputConfig {
    /// Record encoding and routing settings.
    pub encoder: EncoderConfig,
    /// Client connection settings.
    pub client: ClientConfig,
}

impl OutputConfig {
    /// Stream every record is sent to.
    pub fn stream_name(&self) -> &str {
        &self.encoder.stream_name
    }
}
