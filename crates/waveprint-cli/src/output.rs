//! JSON output formatting

use serde::Serialize;

use waveprint_core::{RecognitionResult, TrackMatch};

#[derive(Serialize)]
struct QueryOutput<'a> {
    query_path: &'a str,
    successful: bool,
    matches: &'a [TrackMatch],
}

/// Print a recognition result as JSON
pub fn print_query_result(query_path: &str, result: &RecognitionResult) {
    let output = QueryOutput {
        query_path,
        successful: result.is_successful(),
        matches: &result.matches,
    };
    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }
}

/// Print an ingest status line as JSON
pub fn print_ingest_status(
    input: &str,
    track_id: &str,
    fingerprints: usize,
    elapsed_seconds: f64,
    destination: &str,
) {
    let output = serde_json::json!({
        "status": "success",
        "input_file": input,
        "track_id": track_id,
        "num_fingerprints": fingerprints,
        "processing_time_seconds": elapsed_seconds,
        "destination": destination,
    });
    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing status: {}", e),
    }
}
