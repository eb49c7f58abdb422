pub mod fixtures;

pub use fixtures::{options, recording_client, started_output};
