//! Log output to a rotated file in JSON
//!
//! Installing a global subscriber can happen once per process, so this file
//! holds a single test.

#![cfg(all(feature = "cli", feature = "tracing-json", feature = "tracing-files"))]

use photo_genius::tracing_config::{TracingConfig, TracingFormat, TracingOutput};
use serde_json::Value;

#[test]
fn test_json_events_are_written_to_rotated_file() {
    let dir = tempfile::tempdir().unwrap();
    TracingConfig::new()
        .with_format(TracingFormat::Json)
        .with_output(TracingOutput::File(dir.path().join("gateway.log")))
        .init()
        .unwrap();

    tracing::info!(request_id = "req-42", "Image data received");
    tracing::debug!("filtered out at the default verbosity");

    let log_file = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("gateway.log"))
        })
        .expect("rotated log file");
    let contents = std::fs::read_to_string(log_file).unwrap();

    let event: Value = contents
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .find(|event| event["fields"]["message"] == "Image data received")
        .expect("JSON event for the info message");
    assert_eq!(event["level"], "INFO");
    assert_eq!(event["fields"]["request_id"], "req-42");
    assert!(!contents.contains("filtered out"));
}
