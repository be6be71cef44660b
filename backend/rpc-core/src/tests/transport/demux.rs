use crate::diagnostics::Diagnostics;
use crate::error::RpcError;
use crate::transport::{BatchResponse, RpcEnvelope, demultiplex};

use models::Call;

use serde_json::{Value, json};

fn envelope(id: &str, payload: Value, sequence_index: u32) -> RpcEnvelope {
    RpcEnvelope {
        matched_id: id.to_string(),
        response_payload: payload,
        sequence_index,
        error_code: None,
    }
}

fn call(id: &str) -> Call {
    Call::builder().with_id(id).build().unwrap()
}

/// **VALUE**: Verifies a caller gets the payload for its own id only.
///
/// **WHY THIS MATTERS**: One stream can carry envelopes for several ids. Returning the
/// first envelope regardless of id hands the caller someone else's data.
///
/// **BUG THIS CATCHES**: Would catch positional matching ("first envelope wins").
#[test]
fn given_envelopes_for_a_and_b_when_requesting_b_then_returns_only_b() {
    // GIVEN: A's envelope arrives first
    let response = BatchResponse {
        envelopes: vec![
            envelope("A", json!(["from A"]), 0),
            envelope("B", json!(["from B"]), 0),
        ],
        bytes_read: 100,
    };

    // WHEN: Demultiplexing for a call to B
    let results = demultiplex(&[call("B")], response, &Diagnostics::disabled());

    // THEN: B's payload, untouched by A's
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap(), &json!(["from B"]));
}

#[test]
fn given_batch_when_demultiplexing_then_results_follow_call_order() {
    let response = BatchResponse {
        envelopes: vec![envelope("B", json!(2), 0), envelope("A", json!(1), 0)],
        bytes_read: 10,
    };

    let results = demultiplex(&[call("A"), call("B")], response, &Diagnostics::disabled());

    assert_eq!(results[0].as_ref().unwrap(), &json!(1));
    assert_eq!(results[1].as_ref().unwrap(), &json!(2));
}

/// **VALUE**: Verifies repeated ids in one batch are matched by sequence index.
///
/// **WHY THIS MATTERS**: Two `GetProject` calls for different notebooks share an id.
/// Envelopes may arrive out of order; the sequence index is the only tie-breaker.
///
/// **BUG THIS CATCHES**: Would catch matching both calls to the first envelope.
#[test]
fn given_duplicate_ids_when_demultiplexing_then_matches_by_sequence_index() {
    // GIVEN: Two envelopes for the same id, arriving in reverse order
    let response = BatchResponse {
        envelopes: vec![
            envelope("rLM1Ne", json!(["second"]), 2),
            envelope("rLM1Ne", json!(["first"]), 1),
        ],
        bytes_read: 10,
    };

    // WHEN: Demultiplexing two calls with that id
    let results = demultiplex(
        &[call("rLM1Ne"), call("rLM1Ne")],
        response,
        &Diagnostics::disabled(),
    );

    // THEN: First call gets the lower sequence index
    assert_eq!(results[0].as_ref().unwrap(), &json!(["first"]));
    assert_eq!(results[1].as_ref().unwrap(), &json!(["second"]));
}

#[test]
fn given_no_envelope_for_call_when_demultiplexing_then_returns_framing_error() {
    let response = BatchResponse {
        envelopes: vec![envelope("A", json!(1), 0)],
        bytes_read: 77,
    };

    let results = demultiplex(&[call("Z")], response, &Diagnostics::disabled());

    match results[0].as_ref().unwrap_err() {
        RpcError::Framing {
            rpc_id,
            offset,
            message,
            ..
        } => {
            assert_eq!(rpc_id.as_deref(), Some("Z"));
            assert_eq!(*offset, 77);
            assert!(message.contains("missing envelope"));
        }
        other => panic!("Expected Framing, got {other:?}"),
    }
}

#[test]
fn given_error_code_when_demultiplexing_then_returns_remote_error() {
    let mut failed = envelope("WWINqb", Value::Null, 0);
    failed.error_code = Some(5);
    let response = BatchResponse {
        envelopes: vec![failed],
        bytes_read: 10,
    };

    let results = demultiplex(&[call("WWINqb")], response, &Diagnostics::disabled());

    match results[0].as_ref().unwrap_err() {
        RpcError::Remote { rpc_id, code, .. } => {
            assert_eq!(rpc_id, "WWINqb");
            assert_eq!(*code, 5);
        }
        other => panic!("Expected Remote, got {other:?}"),
    }
}
