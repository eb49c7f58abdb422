//! Fixtures that provide configured outputs backed by a
//! [`RecordingClient`], so the full pipeline can be exercised without a
//! network.

use std::sync::Arc;

use femtokinesis::{
    KeyFnRegistry, KinesisOptions, KinesisOutput, test_utils::RecordingClient,
};
use rstest::fixture;

/// Complete options for the `events` stream, keyed by `user_id`.
#[fixture]
pub fn options() -> KinesisOptions {
    KinesisOptions::new()
        .with_aws_key_id("AKIDEXAMPLE")
        .with_aws_sec_key("secret")
        .with_region("us-east-1")
        .with_stream_name("events")
        .with_partition_key("user_id")
}

/// A client on which only the `events` stream exists.
#[fixture]
pub fn recording_client() -> RecordingClient {
    RecordingClient::new().with_stream("events")
}

/// Configure and start an output from `options` against `client`.
pub fn started_output(
    options: &KinesisOptions,
    registry: &KeyFnRegistry,
    client: &RecordingClient,
) -> KinesisOutput {
    let mut output = KinesisOutput::new();
    output.configure(options, registry).expect("configure");
    output
        .start_with_client(Arc::new(client.clone()))
        .expect("start");
    output
}
