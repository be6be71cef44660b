use crate::diagnostics::{DiagnosticEvent, Diagnostics, MemorySink};
use crate::error::RpcError;
use crate::transport::envelope::parse_frame;
use crate::transport::framing::Frame;

use std::sync::Arc;

use serde_json::json;

fn frame(payload: &str) -> Frame {
    Frame {
        declared_length: payload.len(),
        payload: payload.as_bytes().to_vec(),
        offset: 42,
    }
}

/// **VALUE**: Verifies data envelopes are extracted and status entries skipped.
///
/// **WHY THIS MATTERS**: Real responses interleave `wrb.fr` entries with `di` timing and
/// `af.httprm` entries. Only the former carry payloads.
///
/// **BUG THIS CATCHES**: Would catch a parser that treats every entry as data, or that
/// fails on unknown markers instead of skipping them.
#[test]
fn given_mixed_entries_when_parsing_frame_then_returns_only_data_envelopes() {
    // GIVEN: A frame with one data envelope and two status entries
    let payload = json!([
        ["wrb.fr", "wXbhsf", "[[\"Notebook\"]]", null, null, null, "generic"],
        ["di", 123],
        ["af.httprm", 122, "-1", 5]
    ])
    .to_string();
    let sink = Arc::new(MemorySink::new());
    let diagnostics = Diagnostics::with_sink(sink.clone());

    // WHEN: Parsing
    let envelopes = parse_frame(&frame(&payload), &diagnostics).unwrap();

    // THEN: One envelope with its payload parsed from the embedded JSON string
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].matched_id, "wXbhsf");
    assert_eq!(envelopes[0].response_payload, json!([["Notebook"]]));
    assert_eq!(envelopes[0].sequence_index, 0);
    assert_eq!(envelopes[0].error_code, None);

    let skipped: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, DiagnosticEvent::EnvelopeSkipped { .. }))
        .collect();
    assert_eq!(skipped.len(), 2);
}

/// **VALUE**: Verifies an error code in a null-payload envelope is surfaced.
///
/// **WHY THIS MATTERS**: Code 16 is the only signal of an expired session on some
/// responses that otherwise come back 200.
///
/// **BUG THIS CATCHES**: Would catch treating a null payload as an empty success.
#[test]
fn given_null_payload_with_code_16_when_parsing_then_marks_auth_rejection() {
    // GIVEN: An envelope with no payload and [16] at position 5
    let payload = json!([["wrb.fr", "rLM1Ne", null, null, null, [16], "generic"]]).to_string();

    // WHEN: Parsing
    let envelopes = parse_frame(&frame(&payload), &Diagnostics::disabled()).unwrap();

    // THEN: Error code kept, flagged as auth rejection
    assert_eq!(envelopes[0].error_code, Some(16));
    assert!(envelopes[0].is_auth_rejection());
    assert!(envelopes[0].response_payload.is_null());
}

#[test]
fn given_decimal_sequence_tag_when_parsing_then_uses_it_as_index() {
    let payload = json!([
        ["wrb.fr", "A", "[1]", null, null, null, "2"],
        ["wrb.fr", "A", "[0]", null, null, null, "1"]
    ])
    .to_string();

    let envelopes = parse_frame(&frame(&payload), &Diagnostics::disabled()).unwrap();

    assert_eq!(envelopes[0].sequence_index, 2);
    assert_eq!(envelopes[1].sequence_index, 1);
}

#[test]
fn given_unwrapped_single_entry_when_parsing_then_returns_envelope() {
    let payload = json!(["wrb.fr", "B", "{\"ignored\":1}"]).to_string();

    let envelopes = parse_frame(&frame(&payload), &Diagnostics::disabled()).unwrap();

    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].matched_id, "B");
}

/// **VALUE**: Verifies a frame whose bytes are not JSON is a framing error at its offset.
///
/// **WHY THIS MATTERS**: It indicates the length prefix and the payload disagree, i.e. a
/// protocol change. The offset lets someone find the spot in a captured body.
///
/// **BUG THIS CATCHES**: Would catch a parser that skips bad frames silently.
#[test]
fn given_invalid_json_frame_when_parsing_then_returns_framing_error() {
    // GIVEN: Garbage payload
    let bad = frame("[[\"wrb.fr\",");

    // WHEN: Parsing
    let result = parse_frame(&bad, &Diagnostics::disabled());

    // THEN: Framing error carrying the frame offset
    match result.unwrap_err() {
        RpcError::Framing { offset, message, .. } => {
            assert_eq!(offset, 42);
            assert!(message.contains("not valid JSON"));
        }
        other => panic!("Expected Framing, got {other:?}"),
    }
}

#[test]
fn given_invalid_embedded_payload_when_parsing_then_error_names_rpc() {
    let payload = json!([["wrb.fr", "CCqFvf", "[unterminated", null, null, null, "generic"]])
        .to_string();

    let result = parse_frame(&frame(&payload), &Diagnostics::disabled());

    let error = result.unwrap_err();
    assert_eq!(error.rpc_id(), Some("CCqFvf"));
    assert_eq!(error.error_category(), "framing");
}
