//! End-to-end behaviour of the host lifecycle: configure, start, format,
//! write and shutdown.

mod test_utils;

use base64::{Engine, engine::general_purpose::STANDARD};
use femtokinesis::{
    ConfigError, DeliveryError, KeyFnRegistry, KinesisOptions, KinesisOutput, LogRecord,
    OutputError, OutputState, frame::decode_frames, test_utils::RecordingClient,
};
use rstest::rstest;
use serde_json::{Value, json};
use test_utils::{options, recording_client, started_output};

fn payload(data: &str) -> Value {
    let bytes = STANDARD.decode(data).expect("payload is base64");
    serde_json::from_slice(&bytes).expect("payload is json")
}

#[rstest]
fn records_reach_the_stream_with_routing(options: KinesisOptions, recording_client: RecordingClient) {
    let mut registry = KeyFnRegistry::new();
    registry.register_unary("hash_of", |value| {
        Ok(json!(format!("{}0000", value.as_i64().unwrap_or_default())))
    });
    let options = options
        .with_explicit_hash_key("shard")
        .with_explicit_hash_key_proc("hash_of")
        .with_sequence_number_for_ordering("42");
    let mut output = started_output(&options, &registry, &recording_client);

    let mut buffer = Vec::new();
    buffer.extend(
        output
            .format("web.access", 1_700_000_000, LogRecord::new().with_field("user_id", "alice").with_field("shard", 1))
            .expect("format"),
    );
    buffer.extend(
        output
            .format("web.access", 1_700_000_001, LogRecord::new().with_field("user_id", "bob").with_field("shard", 2))
            .expect("format"),
    );

    let report = output.write(&buffer).expect("write");
    assert_eq!((report.attempted, report.delivered), (2, 2));

    let delivered = recording_client.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].stream_name, "events");
    assert_eq!(delivered[0].partition_key, "alice");
    assert_eq!(delivered[0].explicit_hash_key.as_deref(), Some("10000"));
    assert_eq!(delivered[1].explicit_hash_key.as_deref(), Some("20000"));
    assert_eq!(delivered[1].sequence_number_for_ordering.as_deref(), Some("42"));
    assert_eq!(
        payload(&delivered[1].data),
        json!({"user_id": "bob", "shard": 2, "__tag": "web.access", "__time": 1_700_000_001})
    );

    output.shutdown();
    assert_eq!(output.state(), OutputState::Shutdown);
}

#[rstest]
fn include_flags_control_synthetic_fields(options: KinesisOptions, recording_client: RecordingClient) {
    let options = options.with_include_tag(false).with_include_time(false);
    let output = started_output(&options, &KeyFnRegistry::new(), &recording_client);
    let frame = output
        .format("tag", 5, LogRecord::new().with_field("user_id", 1))
        .expect("format");
    let entries = decode_frames(&frame).expect("decode");
    assert_eq!(payload(&entries[0].data), json!({"user_id": 1}));
}

#[rstest]
fn missing_required_option_fails_before_start(options: KinesisOptions) {
    let mut output = KinesisOutput::new();
    let err = output
        .configure(&options.with_aws_sec_key(""), &KeyFnRegistry::new())
        .expect_err("blank secret");
    assert!(matches!(err, OutputError::Config(ConfigError::Missing("aws_sec_key"))));
    assert_eq!(err.to_string(), "'aws_sec_key' is required");
}

#[rstest]
fn missing_stream_aborts_startup(options: KinesisOptions) {
    let client = RecordingClient::new().with_stream("somewhere-else");
    let mut output = KinesisOutput::new();
    output
        .configure(&options, &KeyFnRegistry::new())
        .expect("configure");
    let err = output
        .start_with_client(std::sync::Arc::new(client))
        .expect_err("stream does not exist");
    assert!(matches!(err, OutputError::StreamCheck { .. }));
    assert!(err.to_string().starts_with("stream \"events\" is not available"));
}

#[rstest]
fn unreachable_endpoint_aborts_startup(options: KinesisOptions) {
    let options = options
        .with_endpoint("http://127.0.0.1:1/")
        .with_connect_timeout_ms(200)
        .with_backoff_base_ms(10)
        .with_backoff_cap_ms(20)
        .with_backoff_deadline_ms(100);
    let mut output = KinesisOutput::new();
    output
        .configure(&options, &KeyFnRegistry::new())
        .expect("configure");
    let err = output.start().expect_err("nothing listens on port 1");
    assert!(matches!(
        err,
        OutputError::StreamCheck {
            source: DeliveryError::Transport(_),
            ..
        }
    ));
    assert_eq!(output.state(), OutputState::Configured);
}

#[rstest]
fn oversize_record_is_reported_and_others_delivered(
    options: KinesisOptions,
    recording_client: RecordingClient,
) {
    let output = started_output(&options, &KeyFnRegistry::new(), &recording_client);
    let mut buffer = output
        .format("t", 0, LogRecord::new().with_field("user_id", "big").with_field("blob", "y".repeat(60 * 1024)))
        .expect("format");
    buffer.extend(
        output
            .format("t", 0, LogRecord::new().with_field("user_id", "small"))
            .expect("format"),
    );

    let Err(OutputError::Delivery(report)) = output.write(&buffer) else {
        panic!("expected a delivery error");
    };
    assert_eq!(report.attempted, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failures[0].partition_key, "big");
    assert!(!report.all_retryable());
    let keys: Vec<_> = recording_client
        .delivered()
        .into_iter()
        .map(|entry| entry.partition_key)
        .collect();
    assert_eq!(keys, ["small"]);
}

#[rstest]
fn options_load_from_ini(recording_client: RecordingClient) {
    let text = "\
[kinesis]
aws_key_id = AKIDEXAMPLE
aws_sec_key = secret
region = ap-northeast-1
stream_name = events
partition_key_proc = constant_key
include_tag = no
";
    let mut registry = KeyFnRegistry::new();
    registry.register_constant("constant_key", || Ok(json!("k")));
    let options = KinesisOptions::from_ini_str(text, "kinesis").expect("parse");
    let output = started_output(&options, &registry, &recording_client);

    let frame = output
        .format("t", 9, LogRecord::new().with_field("m", "x"))
        .expect("format");
    output.write(&frame).expect("write");
    let delivered = recording_client.delivered();
    assert_eq!(delivered[0].partition_key, "k");
    assert_eq!(payload(&delivered[0].data), json!({"m": "x", "__time": 9}));
}
