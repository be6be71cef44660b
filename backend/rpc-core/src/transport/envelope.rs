//! Envelope extraction from frame payloads.
//!
//! A frame payload is a JSON array of entries; each entry is an array whose
//! first element names its type. Data envelopes look like:
//!
//! ```text
//! ["wrb.fr", "<rpc id>", "<payload JSON string>" | null, null, null, [<code>] | null, "generic" | "<n>"]
//! ```
//!
//! Everything else (`di`, `af.httprm`, `e`, ...) is a status entry and skipped.

use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::error::RpcError;
use crate::transport::framing::Frame;

use serde_json::Value;

pub const DATA_ENVELOPE_MARKER: &str = "wrb.fr";
/// Envelope error code the service uses for an unauthenticated call.
pub const UNAUTHENTICATED_CODE: i64 = 16;

const ID_POSITION: usize = 1;
const PAYLOAD_POSITION: usize = 2;
const ERROR_POSITION: usize = 5;
const SEQUENCE_POSITION: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct RpcEnvelope {
    pub matched_id: String,
    /// Parsed payload; `Null` when the service sent none.
    pub response_payload: Value,
    /// Position within the batch; `"generic"` maps to 0.
    pub sequence_index: u32,
    /// Set when the service answered with an error code instead of a payload.
    pub error_code: Option<i64>,
}

impl RpcEnvelope {
    pub fn is_auth_rejection(&self) -> bool {
        self.error_code == Some(UNAUTHENTICATED_CODE)
    }
}

/// Parse every data envelope in one frame.
pub fn parse_frame(frame: &Frame, diagnostics: &Diagnostics) -> Result<Vec<RpcEnvelope>, RpcError> {
    let value: Value = serde_json::from_slice(&frame.payload).map_err(|e| {
        RpcError::framing(format!("frame payload is not valid JSON: {e}"), frame.offset)
    })?;

    let Value::Array(entries) = value else {
        return Err(RpcError::framing("frame payload is not a JSON array", frame.offset));
    };

    // A lone entry arrives unwrapped: ["wrb.fr", ...] rather than [["wrb.fr", ...]].
    if entries.first().is_some_and(Value::is_string) {
        return Ok(parse_entry(&entries, frame.offset, diagnostics)?
            .into_iter()
            .collect());
    }

    let mut envelopes = Vec::new();
    for entry in &entries {
        if let Value::Array(items) = entry {
            if let Some(envelope) = parse_entry(items, frame.offset, diagnostics)? {
                envelopes.push(envelope);
            }
        }
    }
    Ok(envelopes)
}

fn parse_entry(
    items: &[Value],
    offset: usize,
    diagnostics: &Diagnostics,
) -> Result<Option<RpcEnvelope>, RpcError> {
    let Some(marker) = items.first().and_then(Value::as_str) else {
        return Ok(None);
    };
    if marker != DATA_ENVELOPE_MARKER {
        diagnostics.emit(|| DiagnosticEvent::EnvelopeSkipped {
            marker: marker.to_string(),
        });
        return Ok(None);
    }

    let matched_id = items
        .get(ID_POSITION)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::framing("data envelope without an rpc id", offset))?
        .to_string();

    let response_payload = match items.get(PAYLOAD_POSITION) {
        Some(Value::String(raw)) => serde_json::from_str(raw).map_err(|e| {
            RpcError::framing(format!("envelope payload is not valid JSON: {e}"), offset)
                .with_rpc_id(&matched_id)
        })?,
        _ => Value::Null,
    };

    let error_code = if response_payload.is_null() {
        items
            .get(ERROR_POSITION)
            .and_then(Value::as_array)
            .and_then(|error| error.first())
            .and_then(Value::as_i64)
    } else {
        None
    };

    Ok(Some(RpcEnvelope {
        matched_id,
        response_payload,
        sequence_index: sequence_index(items.get(SEQUENCE_POSITION)),
        error_code,
    }))
}

fn sequence_index(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::String(tag)) => tag.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
        _ => 0,
    }
}
