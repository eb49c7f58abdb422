//! Operator-facing option surface and its validation.

use std::time::Duration;

use super::{ConfigError, OutputConfig};
use crate::{
    encoder::EncoderConfig,
    key_resolver::{KeyDerivation, KeyFnRegistry},
    stream_client::{BackoffPolicy, ClientConfig, Credentials},
};

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(ConfigError::InvalidValue {
                option: $field.to_owned(),
                value: $value.to_string(),
                reason: "must be greater than zero".to_owned(),
            })
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, String) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: impl Into<String>) -> Self {
            self.$field = Some(value.into());
            self
        }
    };
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Raw output options, as written by an operator.
///
/// Every field is optional here; [`build`](Self::build) enforces which are
/// required and resolves `*_proc` names against a registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KinesisOptions {
    aws_key_id: Option<String>,
    aws_sec_key: Option<String>,
    aws_session_token: Option<String>,
    region: Option<String>,
    stream_name: Option<String>,
    partition_key: Option<String>,
    partition_key_proc: Option<String>,
    explicit_hash_key: Option<String>,
    explicit_hash_key_proc: Option<String>,
    sequence_number_for_ordering: Option<String>,
    include_tag: bool,
    include_time: bool,
    debug: bool,
    endpoint: Option<String>,
    connect_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    backoff_base_ms: Option<u64>,
    backoff_cap_ms: Option<u64>,
    backoff_deadline_ms: Option<u64>,
}

impl Default for KinesisOptions {
    fn default() -> Self {
        Self {
            aws_key_id: None,
            aws_sec_key: None,
            aws_session_token: None,
            region: None,
            stream_name: None,
            partition_key: None,
            partition_key_proc: None,
            explicit_hash_key: None,
            explicit_hash_key_proc: None,
            sequence_number_for_ordering: None,
            include_tag: true,
            include_time: true,
            debug: false,
            endpoint: None,
            connect_timeout_ms: None,
            request_timeout_ms: None,
            backoff_base_ms: None,
            backoff_cap_ms: None,
            backoff_deadline_ms: None,
        }
    }
}

impl KinesisOptions {
    /// Options with every default applied and nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    option_setter!(
        /// AWS access key id.
        with_aws_key_id, aws_key_id, String
    );
    option_setter!(
        /// AWS secret access key.
        with_aws_sec_key, aws_sec_key, String
    );
    option_setter!(
        /// Session token for temporary credentials.
        with_aws_session_token, aws_session_token, String
    );
    option_setter!(
        /// AWS region hosting the stream.
        with_region, region, String
    );
    option_setter!(
        /// Destination stream.
        with_stream_name, stream_name, String
    );
    option_setter!(
        /// Record field supplying the partition key.
        with_partition_key, partition_key, String
    );
    option_setter!(
        /// Registered function deriving the partition key.
        with_partition_key_proc, partition_key_proc, String
    );
    option_setter!(
        /// Record field supplying the explicit hash key.
        with_explicit_hash_key, explicit_hash_key, String
    );
    option_setter!(
        /// Registered function deriving the explicit hash key.
        with_explicit_hash_key_proc, explicit_hash_key_proc, String
    );
    option_setter!(
        /// Static ordering token copied onto every entry.
        with_sequence_number_for_ordering, sequence_number_for_ordering, String
    );
    option_setter!(
        /// Endpoint override, for example a local emulator.
        with_endpoint, endpoint, String
    );
    option_setter!(with_connect_timeout_ms, connect_timeout_ms, u64);
    option_setter!(with_request_timeout_ms, request_timeout_ms, u64);
    option_setter!(with_backoff_base_ms, backoff_base_ms, u64);
    option_setter!(with_backoff_cap_ms, backoff_cap_ms, u64);
    option_setter!(with_backoff_deadline_ms, backoff_deadline_ms, u64);

    /// Toggle injection of the `__tag` field.
    pub fn with_include_tag(mut self, include: bool) -> Self {
        self.include_tag = include;
        self
    }

    /// Toggle injection of the `__time` field.
    pub fn with_include_time(mut self, include: bool) -> Self {
        self.include_time = include;
        self
    }

    /// Toggle request/response debug logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set one option from its textual key and value.
    ///
    /// Boolean options accept `true`/`false`, `yes`/`no`, `on`/`off` and
    /// `1`/`0`. Unknown keys are rejected.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let text = || Some(value.to_owned());
        match key {
            "aws_key_id" => self.aws_key_id = text(),
            "aws_sec_key" => self.aws_sec_key = text(),
            "aws_session_token" => self.aws_session_token = text(),
            "region" => self.region = text(),
            "stream_name" => self.stream_name = text(),
            "partition_key" => self.partition_key = text(),
            "partition_key_proc" => self.partition_key_proc = text(),
            "explicit_hash_key" => self.explicit_hash_key = text(),
            "explicit_hash_key_proc" => self.explicit_hash_key_proc = text(),
            "sequence_number_for_ordering" => self.sequence_number_for_ordering = text(),
            "endpoint" => self.endpoint = text(),
            "include_tag" => self.include_tag = parse_bool(key, value)?,
            "include_time" => self.include_time = parse_bool(key, value)?,
            "debug" => self.debug = parse_bool(key, value)?,
            "connect_timeout_ms" => self.connect_timeout_ms = Some(parse_millis(key, value)?),
            "request_timeout_ms" => self.request_timeout_ms = Some(parse_millis(key, value)?),
            "backoff_base_ms" => self.backoff_base_ms = Some(parse_millis(key, value)?),
            "backoff_cap_ms" => self.backoff_cap_ms = Some(parse_millis(key, value)?),
            "backoff_deadline_ms" => self.backoff_deadline_ms = Some(parse_millis(key, value)?),
            other => return Err(ConfigError::UnknownOption(other.to_owned())),
        }
        Ok(())
    }

    /// Build options from textual key/value pairs, applied in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::new();
        for (key, value) in pairs {
            options.set(key.as_ref().trim(), value.as_ref().trim())?;
        }
        Ok(options)
    }

    /// Validate the options and resolve key functions against `registry`.
    ///
    /// Required options are checked first, in the order `aws_key_id`,
    /// `aws_sec_key`, `region`, `stream_name`; then the partition key; then
    /// `*_proc` names; then numeric ranges. Blank strings count as missing.
    pub fn build(&self, registry: &KeyFnRegistry) -> Result<OutputConfig, ConfigError> {
        let aws_key_id = required(&self.aws_key_id, "aws_key_id")?;
        let aws_sec_key = required(&self.aws_sec_key, "aws_sec_key")?;
        let region = required(&self.region, "region")?;
        let stream_name = required(&self.stream_name, "stream_name")?;

        if present(&self.partition_key).is_none() && present(&self.partition_key_proc).is_none() {
            return Err(ConfigError::MissingPartitionKey);
        }
        let partition_key = derivation(
            &self.partition_key,
            &self.partition_key_proc,
            "partition_key_proc",
            registry,
        )?
        .ok_or(ConfigError::MissingPartitionKey)?;
        let explicit_hash_key = derivation(
            &self.explicit_hash_key,
            &self.explicit_hash_key_proc,
            "explicit_hash_key_proc",
            registry,
        )?;

        let mut credentials = Credentials::new(aws_key_id, aws_sec_key);
        credentials.session_token = present(&self.aws_session_token).map(str::to_owned);

        let mut client = ClientConfig::new(region, credentials);
        client.endpoint = present(&self.endpoint).map(str::to_owned);
        client.debug = self.debug;
        if let Some(ms) = self.connect_timeout_ms {
            client.connect_timeout = millis(ensure_positive!(ms, "connect_timeout_ms")?);
        }
        if let Some(ms) = self.request_timeout_ms {
            client.request_timeout = millis(ensure_positive!(ms, "request_timeout_ms")?);
        }
        client.backoff = self.backoff_policy()?;

        let mut encoder = EncoderConfig::new(stream_name, partition_key);
        encoder.include_tag = self.include_tag;
        encoder.include_time = self.include_time;
        encoder.explicit_hash_key = explicit_hash_key;
        encoder.sequence_number_for_ordering =
            present(&self.sequence_number_for_ordering).map(str::to_owned);

        Ok(OutputConfig { encoder, client })
    }

    fn backoff_policy(&self) -> Result<BackoffPolicy, ConfigError> {
        let mut policy = BackoffPolicy::default();
        if let Some(ms) = self.backoff_base_ms {
            policy.base = millis(ensure_positive!(ms, "backoff_base_ms")?);
        }
        if let Some(ms) = self.backoff_cap_ms {
            policy.cap = millis(ensure_positive!(ms, "backoff_cap_ms")?);
        }
        if let Some(ms) = self.backoff_deadline_ms {
            policy.deadline = millis(ensure_positive!(ms, "backoff_deadline_ms")?);
        }
        if policy.cap < policy.base {
            return Err(ConfigError::InvalidValue {
                option: "backoff_cap_ms".to_owned(),
                value: policy.cap.as_millis().to_string(),
                reason: "must not be smaller than backoff_base_ms".to_owned(),
            });
        }
        Ok(policy)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn required(value: &Option<String>, option: &'static str) -> Result<String, ConfigError> {
    present(value)
        .map(str::to_owned)
        .ok_or(ConfigError::Missing(option))
}

fn derivation(
    field: &Option<String>,
    function: &Option<String>,
    option: &'static str,
    registry: &KeyFnRegistry,
) -> Result<Option<KeyDerivation>, ConfigError> {
    let function = match present(function) {
        Some(name) => Some(registry.get(name).ok_or_else(|| {
            ConfigError::UnknownKeyFunction {
                option,
                name: name.to_owned(),
            }
        })?),
        None => None,
    };
    Ok(KeyDerivation::new(
        present(field).map(str::to_owned),
        function,
    ))
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn parse_bool(option: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            option: option.to_owned(),
            value: value.to_owned(),
            reason: "expected a boolean".to_owned(),
        }),
    }
}

fn parse_millis(option: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|err| ConfigError::InvalidValue {
        option: option.to_owned(),
        value: value.to_owned(),
        reason: err.to_string(),
    })
}
