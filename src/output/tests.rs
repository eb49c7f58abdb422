//! Lifecycle tests for [`KinesisOutput`].

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::{
    config::KinesisOptions,
    dispatcher::DrainReport,
    encoder::MAX_RECORD_PAYLOAD_BYTES,
    frame::decode_frames,
    key_resolver::KeyFnRegistry,
    log_record::LogRecord,
    stream_client::DeliveryError,
    test_utils::RecordingClient,
};

#[fixture]
fn options() -> KinesisOptions {
    KinesisOptions::new()
        .with_aws_key_id("AKID")
        .with_aws_sec_key("secret")
        .with_region("us-east-1")
        .with_stream_name("events")
        .with_partition_key("user_id")
}

#[fixture]
fn client() -> RecordingClient {
    RecordingClient::new().with_stream("events")
}

fn started(options: &KinesisOptions, client: &RecordingClient) -> KinesisOutput {
    let mut output = KinesisOutput::new();
    output
        .configure(options, &KeyFnRegistry::new())
        .expect("configure");
    output
        .start_with_client(Arc::new(client.clone()))
        .expect("start");
    output
}

#[rstest]
fn walks_the_lifecycle(options: KinesisOptions, client: RecordingClient) {
    let mut output = KinesisOutput::new();
    assert_eq!(output.state(), OutputState::Unconfigured);
    output
        .configure(&options, &KeyFnRegistry::new())
        .expect("configure");
    assert_eq!(output.state(), OutputState::Configured);
    output
        .start_with_client(Arc::new(client.clone()))
        .expect("start");
    assert_eq!(output.state(), OutputState::Started);
    assert_eq!(client.describe_calls(), 1);
    output.shutdown();
    assert_eq!(output.state(), OutputState::Shutdown);
    assert!(output.config().is_none());
}

#[rstest]
fn formatted_frames_are_delivered_in_order(options: KinesisOptions, client: RecordingClient) {
    let output = started(&options, &client);
    let mut buffer = Vec::new();
    for user in ["u1", "u2", "u3"] {
        let record = LogRecord::new().with_field("user_id", user);
        buffer.extend(output.format("app.log", 1000, record).expect("format"));
    }

    let report = output.write(&buffer).expect("write");
    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, 3);

    let keys: Vec<_> = client
        .delivered()
        .into_iter()
        .map(|entry| entry.partition_key)
        .collect();
    assert_eq!(keys, ["u1", "u2", "u3"]);
}

#[rstest]
fn format_yields_exactly_one_frame(options: KinesisOptions, client: RecordingClient) {
    let output = started(&options, &client);
    let frame = output
        .format("app.log", 1000, LogRecord::new().with_field("a", 1).with_field("user_id", 7))
        .expect("format");
    let entries = decode_frames(&frame).expect("decode");
    assert_eq!(entries.len(), 1);
    let payload = STANDARD.decode(&entries[0].data).expect("base64");
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&payload).expect("json"),
        json!({"a": 1, "user_id": 7, "__tag": "app.log", "__time": 1000})
    );
    assert_eq!(entries[0].partition_key, "7");
}

#[rstest]
fn empty_buffer_is_a_no_op(options: KinesisOptions, client: RecordingClient) {
    let output = started(&options, &client);
    assert_eq!(output.write(&[]).expect("write"), DrainReport::default());
    assert_eq!(client.put_calls(), 0);
}

#[rstest]
fn unknown_stream_aborts_startup(options: KinesisOptions) {
    let client = RecordingClient::new().with_stream("other");
    let mut output = KinesisOutput::new();
    output
        .configure(&options, &KeyFnRegistry::new())
        .expect("configure");
    let err = output
        .start_with_client(Arc::new(client))
        .expect_err("stream missing");
    match err {
        OutputError::StreamCheck {
            stream_name,
            source: DeliveryError::Rejected { error_type, .. },
        } => {
            assert_eq!(stream_name, "events");
            assert_eq!(error_type, "ResourceNotFoundException");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(output.state(), OutputState::Configured);
}

#[rstest]
fn invalid_options_leave_output_unconfigured(options: KinesisOptions) {
    let mut output = KinesisOutput::new();
    let err = output
        .configure(&options.with_region(""), &KeyFnRegistry::new())
        .expect_err("blank region");
    assert!(matches!(err, OutputError::Config(ConfigError::Missing("region"))));
    assert_eq!(output.state(), OutputState::Unconfigured);
}

#[rstest]
fn operations_outside_started_are_rejected(options: KinesisOptions, client: RecordingClient) {
    let output = KinesisOutput::new();
    let err = output
        .format("t", 0, LogRecord::new())
        .expect_err("not started");
    assert!(matches!(
        err,
        OutputError::InvalidState {
            operation: "format",
            state: OutputState::Unconfigured
        }
    ));

    let mut output = started(&options, &client);
    let err = output
        .configure(&options, &KeyFnRegistry::new())
        .expect_err("already configured");
    assert!(matches!(err, OutputError::InvalidState { operation: "configure", .. }));

    output.shutdown();
    let err = output.write(&[]).expect_err("shut down");
    assert_eq!(err.to_string(), "cannot write an output that is shut down");
    let err = output
        .start_with_client(Arc::new(client))
        .expect_err("terminal");
    assert!(matches!(
        err,
        OutputError::InvalidState {
            state: OutputState::Shutdown,
            ..
        }
    ));
}

#[rstest]
fn failures_are_isolated_and_reported(options: KinesisOptions) {
    let client = RecordingClient::new().reject_partition_key("bad");
    let output = started(&options, &client);
    let mut buffer = Vec::new();
    for user in ["good-1", "bad", "good-2"] {
        let record = LogRecord::new().with_field("user_id", user);
        buffer.extend(output.format("app", 1, record).expect("format"));
    }

    let err = output.write(&buffer).expect_err("one rejected");
    let OutputError::Delivery(report) = err else {
        panic!("expected delivery error, got {err:?}");
    };
    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].partition_key, "bad");
    assert_eq!(client.delivered().len(), 2);
}

#[rstest]
fn oversize_record_fails_delivery(options: KinesisOptions, client: RecordingClient) {
    let output = started(&options, &client);
    let record = LogRecord::new()
        .with_field("user_id", "u")
        .with_field("blob", "x".repeat(MAX_RECORD_PAYLOAD_BYTES));
    let frame = output.format("app", 1, record).expect("oversize still formats");

    let err = output.write(&frame).expect_err("too large");
    let OutputError::Delivery(report) = err else {
        panic!("expected delivery error, got {err:?}");
    };
    assert!(matches!(
        report.failures[0].error,
        DeliveryError::PayloadTooLarge { limit: MAX_RECORD_PAYLOAD_BYTES, .. }
    ));
    assert!(client.delivered().is_empty());
}

#[rstest]
fn corrupt_buffer_is_a_frame_error(options: KinesisOptions, client: RecordingClient) {
    let output = started(&options, &client);
    let mut buffer = output
        .format("app", 1, LogRecord::new().with_field("user_id", "u"))
        .expect("format");
    buffer.extend_from_slice(&[9, 0]);

    let err = output.write(&buffer).expect_err("trailing garbage");
    assert!(matches!(err, OutputError::Frame(FrameError::TruncatedPrefix { .. })));
    assert_eq!(client.delivered().len(), 1);
}

#[rstest]
fn with_config_skips_configure(options: KinesisOptions, client: RecordingClient) {
    let config = options.build(&KeyFnRegistry::new()).expect("valid");
    let mut output = KinesisOutput::with_config(config);
    assert_eq!(output.state(), OutputState::Configured);
    output
        .start_with_client(Arc::new(client))
        .expect("start");
    assert_eq!(
        output.config().map(OutputConfig::stream_name),
        Some("events")
    );
}

#[rstest]
fn concurrent_writes_share_the_client(options: KinesisOptions, client: RecordingClient) {
    let output = started(&options, &client);
    let buffers: Vec<Vec<u8>> = (0..4)
        .map(|worker| {
            let record = LogRecord::new().with_field("user_id", worker);
            output.format("app", 1, record).expect("format")
        })
        .collect();

    std::thread::scope(|scope| {
        for buffer in &buffers {
            let output = &output;
            scope.spawn(move || output.write(buffer).expect("write"));
        }
    });
    assert_eq!(client.delivered().len(), 4);
}
