//! Configuration consumed by [`KinesisClient`](super::KinesisClient).

use std::{fmt, time::Duration};

/// Default connection timeout applied when establishing HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default overall timeout for a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default base delay for exponential backoff retries.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);
/// Default maximum delay for exponential backoff retries.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);
/// Default absolute deadline for retrying one request.
pub const DEFAULT_BACKOFF_DEADLINE: Duration = Duration::from_secs(30);

/// Static AWS credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    /// Long-lived credentials without a session token.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Exponential backoff policy for retried requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub deadline: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            cap: DEFAULT_BACKOFF_CAP,
            deadline: DEFAULT_BACKOFF_DEADLINE,
        }
    }
}

/// Connection, authentication and retry settings for the Kinesis client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// AWS region hosting the stream.
    pub region: String,
    /// Credentials used to sign requests.
    pub credentials: Credentials,
    /// Endpoint override (for example a local emulator); defaults to the
    /// regional Kinesis endpoint.
    pub endpoint: Option<String>,
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Overall timeout for one request.
    pub request_timeout: Duration,
    /// Backoff applied to retryable failures.
    pub backoff: BackoffPolicy,
    /// Log every request and response at debug level.
    pub debug: bool,
}

impl ClientConfig {
    /// Settings for `region` with default timeouts and backoff.
    pub fn new(region: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            region: region.into(),
            credentials,
            endpoint: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backoff: BackoffPolicy::default(),
            debug: false,
        }
    }

    /// Endpoint requests are sent to.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://kinesis.{}.amazonaws.com/", self.region),
        }
    }
}
