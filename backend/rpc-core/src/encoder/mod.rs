//! Call encoder: batches of [`Call`]s to the batch endpoint's form body.
//!
//! Wire shape of the `f.req` field:
//!
//! ```text
//! [[["<rpc id>", "<args as JSON string>", null, "generic"], ...]]
//! ```
//!
//! Arguments keep their positions; omitted slots stay `null`.

use crate::config::EndpointConfig;
use crate::error::RpcError;
use crate::session::Credentials;

use models::{ArgValue, Call};

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Number, Value};
use url::form_urlencoded;
use uuid::Uuid;

pub const FORM_FIELD_REQUEST: &str = "f.req";
pub const FORM_FIELD_ANTI_FORGERY: &str = "at";
pub const QUERY_RPC_IDS: &str = "rpcids";
pub const QUERY_REQUEST_ID: &str = "_reqid";
pub const QUERY_SOURCE_PATH: &str = "source-path";
pub const GENERIC_TAG: &str = "generic";

const REQUEST_ID_STRIDE: u64 = 100_000;
const REQUEST_SEED_MIN: u64 = 1_000;
const REQUEST_SEED_SPAN: u64 = 9_000;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);
static REQUEST_SEED: OnceLock<u64> = OnceLock::new();

fn request_seed() -> u64 {
    *REQUEST_SEED.get_or_init(|| {
        REQUEST_SEED_MIN + (Uuid::new_v4().as_u128() % u128::from(REQUEST_SEED_SPAN)) as u64
    })
}

/// Next process-wide request index: `seed + n * 100000`.
pub fn next_request_index() -> u64 {
    let n = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    request_seed() + n * REQUEST_ID_STRIDE
}

/// A fully encoded batch request, ready to send.
#[derive(Debug, Clone)]
pub struct EncodedRequest {
    pub rpc_ids: Vec<String>,
    pub request_index: u64,
    pub query: Vec<(String, String)>,
    /// The `f.req` JSON on its own. Holds no credentials, so it is what
    /// diagnostics may preview.
    pub batch_json: String,
    /// `application/x-www-form-urlencoded` body, anti-forgery token included.
    pub body: String,
}

impl EncodedRequest {
    /// Comma-joined ids, for logs and error context.
    pub fn label(&self) -> String {
        self.rpc_ids.join(",")
    }
}

#[derive(Debug, Clone)]
pub struct CallEncoder {
    scope_path_prefix: String,
    url_params: Vec<(String, String)>,
}

impl CallEncoder {
    pub fn new(endpoint: &EndpointConfig) -> Self {
        Self {
            scope_path_prefix: endpoint.scope_path_prefix.clone(),
            url_params: endpoint
                .url_params
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    /// Encode a batch. Consumes one request index per call to this method.
    ///
    /// The request is routed by a single `source-path`, so every call that
    /// carries a scope key must carry the same one; unscoped calls may join
    /// any batch.
    pub fn encode(
        &self,
        calls: &[Call],
        credentials: &Credentials,
    ) -> Result<EncodedRequest, RpcError> {
        if calls.is_empty() {
            return Err(RpcError::encoding("", "batch", "batch contains no calls"));
        }

        let mut batch = Vec::with_capacity(calls.len());
        for call in calls {
            let args = encode_args(call)?;
            let args_json = serde_json::to_string(&args)
                .map_err(|e| RpcError::encoding(call.id(), "args", e.to_string()))?;
            batch.push(Value::Array(vec![
                Value::String(call.id().to_string()),
                Value::String(args_json),
                Value::Null,
                Value::String(GENERIC_TAG.to_string()),
            ]));
        }
        let envelope = Value::Array(vec![Value::Array(batch)]);
        let rpc_ids: Vec<String> = calls.iter().map(|call| call.id().to_string()).collect();
        let scope_key = batch_scope_key(calls)?;

        let batch_json = serde_json::to_string(&envelope)
            .map_err(|e| RpcError::encoding(rpc_ids.join(","), "f.req", e.to_string()))?;

        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair(FORM_FIELD_REQUEST, &batch_json);
        if !credentials.anti_forgery_token.is_empty() {
            form.append_pair(FORM_FIELD_ANTI_FORGERY, credentials.anti_forgery_token.expose());
        }
        let body = form.finish();

        let request_index = next_request_index();
        let mut query = vec![(QUERY_RPC_IDS.to_string(), rpc_ids.join(","))];
        if let Some(scope_key) = scope_key {
            query.push((
                QUERY_SOURCE_PATH.to_string(),
                format!("{}{scope_key}", self.scope_path_prefix),
            ));
        }
        query.extend(self.url_params.iter().cloned());
        query.push((QUERY_REQUEST_ID.to_string(), request_index.to_string()));
        query.push(("rt".to_string(), "c".to_string()));

        Ok(EncodedRequest {
            rpc_ids,
            request_index,
            query,
            batch_json,
            body,
        })
    }
}

/// The one scope key shared by the scoped calls of a batch, if any.
fn batch_scope_key(calls: &[Call]) -> Result<Option<&str>, RpcError> {
    let mut scoped = calls
        .iter()
        .filter_map(|call| call.scope_key().map(|key| (call.id(), key)));
    let Some((_, first)) = scoped.next() else {
        return Ok(None);
    };
    match scoped.find(|(_, key)| *key != first) {
        Some((rpc_id, other)) => Err(RpcError::encoding(
            rpc_id,
            "scope_key",
            format!("batch mixes scope keys {first:?} and {other:?}"),
        )),
        None => Ok(Some(first)),
    }
}

/// Serialize a call's positional arguments to a JSON array.
pub fn encode_args(call: &Call) -> Result<Value, RpcError> {
    call.args()
        .iter()
        .enumerate()
        .map(|(position, arg)| encode_value(call.id(), arg, &format!("args[{position}]")))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn encode_value(rpc_id: &str, value: &ArgValue, path: &str) -> Result<Value, RpcError> {
    match value {
        ArgValue::Null => Ok(Value::Null),
        ArgValue::Bool(b) => Ok(Value::Bool(*b)),
        ArgValue::Int(i) => Ok(Value::Number(Number::from(*i))),
        ArgValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| RpcError::encoding(rpc_id, path, format!("non-finite number {f}"))),
        ArgValue::Str(s) => Ok(Value::String(s.clone())),
        ArgValue::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| encode_value(rpc_id, item, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        ArgValue::Json(json) => check_json(rpc_id, json, path).map(|()| json.clone()),
    }
}

/// Positional payloads carry no keyed values, so objects are rejected.
fn check_json(rpc_id: &str, value: &Value, path: &str) -> Result<(), RpcError> {
    match value {
        Value::Object(_) => Err(RpcError::encoding(
            rpc_id,
            path,
            "JSON objects are not representable in positional arguments",
        )),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check_json(rpc_id, item, &format!("{path}[{i}]"))),
        _ => Ok(()),
    }
}
