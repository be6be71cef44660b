use crate::error::NlmError;

use common::ErrorLocation;

use models::{ArgValue, Call};

use rpc_core::{BatchClient, CoreError, RpcError};

use std::panic::Location;

use log::info;
use serde_json::Value;

/// Execute one RPC with JSON-array arguments and pretty-print its payload.
pub async fn run(
    client: &BatchClient,
    rpc_id: &str,
    args_json: &str,
    scope: Option<&str>,
) -> Result<String, NlmError> {
    let call = build_call(rpc_id, args_json, scope)?;
    info!("Executing raw rpc {rpc_id}");
    let payload = client.execute_raw(&call).await.map_err(CoreError::from)?;
    format_payload(&payload)
}

/// Parse `args_json` as a JSON array; each element becomes one positional argument.
#[track_caller]
pub fn build_call(rpc_id: &str, args_json: &str, scope: Option<&str>) -> Result<Call, NlmError> {
    let parsed: Value = serde_json::from_str(args_json).map_err(|e| NlmError::Usage {
        message: format!("ARGS_JSON is not valid JSON: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;
    let Value::Array(items) = parsed else {
        return Err(NlmError::Usage {
            message: String::from("ARGS_JSON must be a JSON array"),
            location: ErrorLocation::from(Location::caller()),
        });
    };

    let mut builder = Call::builder()
        .with_id(rpc_id)
        .with_args(items.into_iter().map(ArgValue::from).collect());
    if let Some(scope) = scope {
        builder = builder.with_scope_key(scope);
    }
    builder.build().map_err(|e| NlmError::Core(CoreError::from(e)))
}

#[track_caller]
fn format_payload(payload: &Value) -> Result<String, NlmError> {
    serde_json::to_string_pretty(payload).map_err(|e| NlmError::Nlm {
        message: format!("Failed to format payload: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Exit-code-relevant classification of a failed raw call, for the log.
pub fn describe_failure(error: &RpcError) -> String {
    match error.rpc_id() {
        Some(rpc_id) => format!("{} ({rpc_id})", error.error_category()),
        None => error.error_category().to_string(),
    }
}
