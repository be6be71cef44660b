//! Test helpers for batch endpoint integration tests.
//!
//! - Building framed response bodies
//! - A client config pointed at a mock server with fast retries
//! - Clients over fixed and refreshable sessions

use rpc_core::config::ClientConfig;
use rpc_core::session::{CredentialProvider, Credentials, Session};
use rpc_core::{BatchClient, DEFAULT_BATCH_PATH, RpcError};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use wiremock::MockServer;

pub const BATCH_PATH: &str = DEFAULT_BATCH_PATH;
pub const STALE_TOKEN: &str = "stale-token";
pub const FRESH_TOKEN: &str = "fresh-token";
pub const TEST_COOKIES: &str = "SID=sid-value; HSID=hsid-value";

/// One length-prefixed chunk.
pub fn frame(payload: &str) -> String {
    format!("{}\n{}\n", payload.len(), payload)
}

/// Anti-hijack preamble followed by one chunk per payload.
pub fn response_body(payloads: &[String]) -> String {
    let mut body = String::from(")]}'\n\n");
    for payload in payloads {
        body.push_str(&frame(payload));
    }
    body
}

/// A data envelope plus the timing entry the service appends.
pub fn data_envelope(rpc_id: &str, payload: &Value) -> String {
    json!([
        ["wrb.fr", rpc_id, payload.to_string(), null, null, null, "generic"],
        ["di", 42]
    ])
    .to_string()
}

/// An envelope carrying an error code instead of a payload.
pub fn error_envelope(rpc_id: &str, code: i64) -> String {
    json!([["wrb.fr", rpc_id, null, null, null, [code], "generic"]]).to_string()
}

pub fn test_config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.endpoint.base_url = server.uri();
    config.retry.max_retries = 2;
    config.retry.initial_delay_ms = 10;
    config.retry.max_delay_ms = 50;
    config.timeout_secs = 5;
    config
}

pub fn stale_credentials() -> Credentials {
    Credentials::new(STALE_TOKEN, TEST_COOKIES)
}

pub fn fixed_client(server: &MockServer) -> BatchClient {
    BatchClient::new(
        &test_config(server),
        Arc::new(Session::fixed(stale_credentials())),
    )
    .expect("Failed to build client")
}

/// Swaps in [`FRESH_TOKEN`] and counts how often it was asked to.
pub struct CountingProvider {
    calls: AtomicUsize,
}

impl CountingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for CountingProvider {
    async fn refresh(&self, current: &Credentials) -> Result<Credentials, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;
        let mut fresh = current.clone();
        fresh.anti_forgery_token = FRESH_TOKEN.into();
        Ok(fresh)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}
