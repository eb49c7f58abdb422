//! Blocking Kinesis client built on `ureq`.

use std::{sync::Arc, thread, time::Instant};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned, de::IgnoredAny};
use ureq::{Agent, AgentBuilder};

use crate::encoder::{EncodedEntry, MAX_RECORD_PAYLOAD_BYTES};

use super::{
    ClientError, DeliveryError, PutRecordOutput, StreamClient, StreamDescription,
    backoff::BackoffState,
    config::ClientConfig,
    signing::{SigningRequest, sign},
};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "Kinesis_20131202";

/// Error types the service uses for throttling; these are retried even though
/// they arrive with a 400 status.
const THROTTLING_ERROR_TYPES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "LimitExceededException",
];

/// Classification of a service response for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseClass {
    /// 2xx responses - request succeeded.
    Success,
    /// 5xx, 429 or throttling - retry with backoff.
    Retryable,
    /// Any other status - do not retry.
    Permanent,
}

/// Classifies a status code and service error type for retry logic.
///
/// `error_type` may carry a namespace prefix (`com.amazonaws.kinesis#...`).
pub(crate) fn classify_response(status: u16, error_type: &str) -> ResponseClass {
    let error_type = error_type.rsplit('#').next().unwrap_or(error_type);
    match status {
        200..=299 => ResponseClass::Success,
        429 | 500..=599 => ResponseClass::Retryable,
        400 if THROTTLING_ERROR_TYPES.contains(&error_type) => ResponseClass::Retryable,
        _ => ResponseClass::Permanent,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStreamInput<'a> {
    stream_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStreamResponse {
    stream_description: DescribeStreamBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStreamBody {
    stream_name: String,
    stream_status: String,
    #[serde(default)]
    shards: Vec<IgnoredAny>,
}

/// `PutRecord` request body.
///
/// `Data` is a blob in the service model, so it travels base64-encoded; the
/// entry's data (itself base64 of the JSON record) is what consumers read back.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutRecordInput<'a> {
    stream_name: &'a str,
    data: String,
    partition_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    explicit_hash_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_number_for_ordering: Option<&'a str>,
}

impl<'a> From<&'a EncodedEntry> for PutRecordInput<'a> {
    fn from(entry: &'a EncodedEntry) -> Self {
        Self {
            stream_name: &entry.stream_name,
            data: BASE64_STANDARD.encode(entry.data.as_bytes()),
            partition_key: &entry.partition_key,
            explicit_hash_key: entry.explicit_hash_key.as_deref(),
            sequence_number_for_ordering: entry.sequence_number_for_ordering.as_deref(),
        }
    }
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(alias = "Message", default)]
    message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    url: String,
    host: String,
    path: String,
}

impl Endpoint {
    fn parse(raw: &str) -> Result<Self, ClientError> {
        let invalid = || ClientError::Endpoint(raw.to_owned());
        let (scheme, rest) = raw.split_once("://").ok_or_else(invalid)?;
        let default_port = match scheme {
            "http" => ":80",
            "https" => ":443",
            _ => return Err(invalid()),
        };
        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, "/"),
        };
        if authority.is_empty() || path.contains('?') {
            return Err(invalid());
        }
        // Match the Host header the HTTP client sends: default ports are elided.
        let host = authority.strip_suffix(default_port).unwrap_or(authority);
        Ok(Self {
            url: format!("{scheme}://{authority}{path}"),
            host: host.to_owned(),
            path: path.to_owned(),
        })
    }
}

/// [`StreamClient`] for Amazon Kinesis Data Streams.
///
/// The client is cheap to share: the underlying agent pools connections and
/// each call keeps its own backoff state.
pub struct KinesisClient {
    config: ClientConfig,
    agent: Agent,
    endpoint: Endpoint,
}

impl KinesisClient {
    /// Build a client from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let endpoint = Endpoint::parse(&config.endpoint_url())?;
        let tls = native_tls::TlsConnector::new()?;
        let agent = AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.request_timeout)
            .tls_connector(Arc::new(tls))
            .build();
        Ok(Self {
            config,
            agent,
            endpoint,
        })
    }

    /// Settings in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn call<I: Serialize, O: DeserializeOwned>(
        &self,
        operation: &str,
        input: &I,
    ) -> Result<O, DeliveryError> {
        let payload =
            serde_json::to_vec(input).map_err(|err| DeliveryError::Malformed(err.to_string()))?;
        let mut backoff = BackoffState::new(self.config.backoff.clone());

        loop {
            let now = Instant::now();
            match self.send_once(operation, &payload) {
                Ok(body) => {
                    return serde_json::from_str(&body)
                        .map_err(|err| DeliveryError::Malformed(err.to_string()));
                }
                Err(err) if err.is_retryable() => {
                    let Some(delay) = backoff.next_sleep(now) else {
                        warn!("KinesisClient {operation} failed: {err}; retry deadline exhausted");
                        return Err(err);
                    };
                    warn!("KinesisClient {operation} failed: {err}; retrying in {delay:?}");
                    thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn send_once(&self, operation: &str, payload: &[u8]) -> Result<String, DeliveryError> {
        let target = format!("{TARGET_PREFIX}.{operation}");
        let credentials = &self.config.credentials;
        let signature = sign(
            &SigningRequest {
                host: &self.endpoint.host,
                path: &self.endpoint.path,
                content_type: CONTENT_TYPE,
                target: &target,
                region: &self.config.region,
                payload,
                credentials,
            },
            Utc::now(),
        );

        let mut request = self
            .agent
            .post(&self.endpoint.url)
            .set("Content-Type", CONTENT_TYPE)
            .set("X-Amz-Target", &target)
            .set("X-Amz-Date", &signature.amz_date)
            .set("Authorization", &signature.authorization);
        if let Some(token) = &credentials.session_token {
            request = request.set("X-Amz-Security-Token", token);
        }

        if self.config.debug {
            debug!(
                "KinesisClient {operation} request to {}: {}",
                self.endpoint.url,
                String::from_utf8_lossy(payload)
            );
        }

        match request.send_bytes(payload) {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|err| DeliveryError::Transport(err.to_string()))?;
                if self.config.debug {
                    debug!("KinesisClient {operation} response {status}: {body}");
                }
                Ok(body)
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                if self.config.debug {
                    debug!("KinesisClient {operation} response {status}: {body}");
                }
                let ErrorBody {
                    error_type,
                    message,
                } = serde_json::from_str::<ErrorBody>(&body).unwrap_or_default();
                Err(DeliveryError::Rejected {
                    status,
                    error_type,
                    message,
                })
            }
            Err(ureq::Error::Transport(err)) => Err(DeliveryError::Transport(err.to_string())),
        }
    }
}

impl StreamClient for KinesisClient {
    fn describe_stream(&self, stream_name: &str) -> Result<StreamDescription, DeliveryError> {
        let response: DescribeStreamResponse =
            self.call("DescribeStream", &DescribeStreamInput { stream_name })?;
        let body = response.stream_description;
        Ok(StreamDescription {
            stream_name: body.stream_name,
            status: body.stream_status,
            shard_count: body.shards.len(),
        })
    }

    fn put_record(&self, entry: &EncodedEntry) -> Result<PutRecordOutput, DeliveryError> {
        if entry.exceeds_payload_limit() {
            return Err(DeliveryError::PayloadTooLarge {
                size: entry.payload_len(),
                limit: MAX_RECORD_PAYLOAD_BYTES,
            });
        }
        self.call("PutRecord", &PutRecordInput::from(entry))
    }
}

impl std::fmt::Debug for KinesisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KinesisClient")
            .field("endpoint", &self.endpoint.url)
            .field("region", &self.config.region)
            .finish()
    }
}
