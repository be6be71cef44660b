use crate::helpers::{
    BATCH_PATH, CountingProvider, FRESH_TOKEN, data_envelope, error_envelope, fixed_client,
    request_count, response_body, stale_credentials, test_config,
};

use rpc_core::session::{PageTokenProvider, Session};
use rpc_core::{BatchClient, RpcError};

use models::Call;

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn call(id: &str) -> Call {
    Call::builder().with_id(id).build().unwrap()
}

/// Batch endpoint that accepts only the fresh token and answers 401 otherwise.
async fn mount_token_gated_endpoint(server: &MockServer) {
    // Mounted first so it wins over the catch-all rejection
    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .and(body_string_contains(format!("at={FRESH_TOKEN}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(response_body(&[data_envelope("A", &json!(["fresh"]))])),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(server)
        .await;
}

/// **VALUE**: Verifies five concurrent calls rejected together share one refresh.
///
/// **WHY THIS MATTERS**: When the token expires every in-flight call sees 401 at once.
/// Each refreshing independently would hit the provider five times and race to install
/// five different tokens.
///
/// **BUG THIS CATCHES**: Would catch a transport that refreshes without passing the
/// generation it saw rejected.
#[tokio::test]
async fn given_five_concurrent_calls_when_all_rejected_then_one_refresh_and_all_succeed() {
    // GIVEN: An endpoint gated on the fresh token and a counting provider
    let server = MockServer::start().await;
    mount_token_gated_endpoint(&server).await;
    let provider = CountingProvider::new();
    let session = Arc::new(Session::new(stale_credentials(), provider.clone()));
    let client = BatchClient::new(&test_config(&server), session).unwrap();

    // WHEN: Five calls run concurrently
    let calls: Vec<Call> = (0..5).map(|_| call("A")).collect();
    let results = join_all(calls.iter().map(|c| client.execute_raw(c))).await;

    // THEN: All succeed; the provider ran once
    for result in results {
        assert_eq!(result.unwrap(), json!(["fresh"]));
    }
    assert_eq!(provider.calls(), 1);
    assert_eq!(client.session().current().await.generation, 1);
}

#[tokio::test]
async fn given_rejection_after_refresh_when_executing_then_returns_auth_expired() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let provider = CountingProvider::new();
    let client = BatchClient::new(
        &test_config(&server),
        Arc::new(Session::new(stale_credentials(), provider.clone())),
    )
    .unwrap();

    let error = client.execute_raw(&call("A")).await.unwrap_err();

    match error {
        RpcError::AuthExpired { rpc_id, message, .. } => {
            assert_eq!(rpc_id.as_deref(), Some("A"));
            assert!(message.contains("after refresh"), "{message}");
        }
        other => panic!("Expected AuthExpired, got {other:?}"),
    }
    assert_eq!(provider.calls(), 1);
    assert_eq!(request_count(&server).await, 2);
}

/// **VALUE**: Verifies a login page served with 200 is recognised as an expired session.
///
/// **WHY THIS MATTERS**: The front end redirects expired sessions to an HTML sign-in
/// page with a success status. Reporting that as a framing error sends users hunting
/// for a protocol bug instead of logging in again.
///
/// **BUG THIS CATCHES**: Would catch the missing-preamble error escaping before the body
/// is checked for session-expired markers.
#[tokio::test]
async fn given_login_page_with_200_when_executing_with_fixed_session_then_auth_expired() {
    // GIVEN: A sign-in page instead of a batch response
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<!DOCTYPE html><html><a href=\"https://accounts.google.com/ServiceLogin\">Sign in</a></html>",
        ))
        .mount(&server)
        .await;

    // WHEN: Executing with no refresh mechanism
    let error = fixed_client(&server)
        .execute_raw(&call("A"))
        .await
        .unwrap_err();

    // THEN: AuthExpired, no retry
    assert_eq!(error.error_category(), "auth_expired");
    assert_eq!(error.rpc_id(), Some("A"));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn given_unauthenticated_envelope_when_executing_then_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(format!("at={FRESH_TOKEN}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(response_body(&[data_envelope("A", &json!(["fresh"]))])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(response_body(&[error_envelope("A", 16)])),
        )
        .mount(&server)
        .await;
    let provider = CountingProvider::new();
    let client = BatchClient::new(
        &test_config(&server),
        Arc::new(Session::new(stale_credentials(), provider.clone())),
    )
    .unwrap();

    let raw = client.execute_raw(&call("A")).await.unwrap();

    assert_eq!(raw, json!(["fresh"]));
    assert_eq!(provider.calls(), 1);
}

/// **VALUE**: Verifies the page-token provider re-derives the token with the same cookies.
///
/// **WHY THIS MATTERS**: It is the default recovery path for long-running sessions;
/// cookies last for weeks, the token for hours.
///
/// **BUG THIS CATCHES**: Would catch the page request going out without cookies, or the
/// refreshed credentials dropping them.
#[tokio::test]
async fn given_page_token_provider_when_rejected_then_fetches_page_and_retries() {
    // GIVEN: The app page embeds a fresh token for requests carrying the session cookie
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "SID=sid-value; HSID=hsid-value"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<script>WIZ_global_data = {{\"SNlM0e\":\"{FRESH_TOKEN}\",\"qwAQke\":\"x\"}};</script>"
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_token_gated_endpoint(&server).await;
    let config = test_config(&server);
    let provider = PageTokenProvider::from_config(&config).unwrap();
    let session = Arc::new(Session::new(stale_credentials(), Arc::new(provider)));
    let client = BatchClient::new(&config, session).unwrap();

    // WHEN: Executing with the stale token
    let raw = client.execute_raw(&call("A")).await.unwrap();

    // THEN: Fresh token installed, cookies intact
    assert_eq!(raw, json!(["fresh"]));
    let snapshot = client.session().current().await;
    assert_eq!(snapshot.credentials.anti_forgery_token.expose(), FRESH_TOKEN);
    assert_eq!(snapshot.credentials.cookie_header(), "SID=sid-value; HSID=hsid-value");
}

#[tokio::test]
async fn given_page_without_token_when_refreshing_then_auth_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ServiceLogin</html>"))
        .mount(&server)
        .await;
    let provider = PageTokenProvider::from_config(&test_config(&server)).unwrap();
    let session = Session::new(stale_credentials(), Arc::new(provider));

    let result = session.refresh().await;

    assert!(matches!(result, Err(RpcError::AuthExpired { .. })));
}
