use crate::diagnostics::{DiagnosticEvent, Diagnostics, MemorySink};
use crate::error::RpcError;
use crate::session::{CredentialProvider, Credentials, Session};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

/// Hands out `token-N` on the N-th call, after a short delay.
struct CountingProvider {
    calls: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for CountingProvider {
    async fn refresh(&self, current: &Credentials) -> Result<Credentials, RpcError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut fresh = current.clone();
        fresh.anti_forgery_token = format!("token-{n}").into();
        Ok(fresh)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

struct FailingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl CredentialProvider for FailingProvider {
    async fn refresh(&self, _current: &Credentials) -> Result<Credentials, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RpcError::from_http_response("page-token", 404, "not found"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

fn stale() -> Credentials {
    Credentials::new("token-0", "SID=abc")
}

/// **VALUE**: Verifies concurrent refreshes for one rejected generation hit the
/// provider exactly once.
///
/// **WHY THIS MATTERS**: A burst of parallel calls all fail together when the token
/// expires. Each one refreshing would hammer the provider and race to overwrite the
/// session with different tokens.
///
/// **BUG THIS CATCHES**: Would catch a refresh without the generation check, or a gate
/// that is not held across the provider call.
#[tokio::test]
async fn given_five_concurrent_refreshes_when_same_generation_then_provider_called_once() {
    // GIVEN: A session at generation 0 with a counting provider
    let provider = CountingProvider::new();
    let sink = Arc::new(MemorySink::new());
    let session = Arc::new(
        Session::new(stale(), provider.clone()).with_diagnostics(Diagnostics::with_sink(sink.clone())),
    );

    // WHEN: Five callers refresh generation 0 at once
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.refresh_after(0).await })
        })
        .collect();
    let mut snapshots = Vec::new();
    for handle in handles {
        snapshots.push(handle.await.unwrap().unwrap());
    }

    // THEN: One provider call; everyone sees generation 1 and the same token
    assert_eq!(provider.calls(), 1);
    for snapshot in &snapshots {
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.credentials.anti_forgery_token.expose(), "token-1");
    }
    let coalesced = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, DiagnosticEvent::RefreshCoalesced { .. }))
        .count();
    assert_eq!(coalesced, 4);
}

#[tokio::test]
async fn given_refreshed_session_when_refreshing_newer_generation_then_calls_provider_again() {
    let provider = CountingProvider::new();
    let session = Session::new(stale(), provider.clone());

    let first = session.refresh().await.unwrap();
    let second = session.refresh_after(first.generation).await.unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(second.generation, 2);
    assert_eq!(session.current().await.generation, 2);
}

/// **VALUE**: Verifies a failed refresh is not retried for the same generation.
///
/// **WHY THIS MATTERS**: When the provider cannot help (login page, 404), every queued
/// caller retrying it multiplies a hopeless request. They should fail fast instead.
///
/// **BUG THIS CATCHES**: Would catch a failure path that forgets to poison the generation.
#[tokio::test]
async fn given_failed_refresh_when_retrying_same_generation_then_fails_without_provider() {
    // GIVEN: A provider that always fails with a non-retryable error
    let provider = Arc::new(FailingProvider {
        calls: AtomicUsize::new(0),
    });
    let session = Session::new(stale(), provider.clone());

    // WHEN: Refreshing twice
    let first = session.refresh_after(0).await;
    let second = session.refresh_after(0).await;

    // THEN: Both AuthExpired, provider consulted once
    assert!(matches!(first, Err(RpcError::AuthExpired { .. })));
    match second.unwrap_err() {
        RpcError::AuthExpired { message, .. } => assert!(message.contains("already failed")),
        other => panic!("Expected AuthExpired, got {other:?}"),
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn given_poisoned_generation_when_replacing_then_session_recovers() {
    let provider = Arc::new(FailingProvider {
        calls: AtomicUsize::new(0),
    });
    let session = Session::new(stale(), provider);
    let _ = session.refresh_after(0).await;

    let replaced = session
        .replace(Credentials::new("token-new", "SID=new"))
        .await;

    assert_eq!(replaced.generation, 1);
    assert_eq!(
        session.current().await.credentials.anti_forgery_token.expose(),
        "token-new"
    );
}

#[tokio::test]
async fn given_fixed_session_when_refreshing_then_returns_auth_expired() {
    let session = Session::fixed(stale());

    let result = session.refresh().await;

    assert_eq!(session.provider_name(), "static");
    assert!(matches!(result, Err(RpcError::AuthExpired { .. })));
    assert_eq!(session.current().await.generation, 0);
}
