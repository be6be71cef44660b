use crate::helpers::{
    BATCH_PATH, STALE_TOKEN, TEST_COOKIES, data_envelope, error_envelope, fixed_client,
    request_count, response_body, stale_credentials, test_config,
};

use rpc_core::diagnostics::MemorySink;
use rpc_core::session::{Credentials, Session};
use rpc_core::{BatchClient, CancellationToken, DiagnosticEvent, Diagnostics, RpcError};

use models::{Call, ScalarType, Schema};

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use url::form_urlencoded;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn call(id: &str) -> Call {
    Call::builder()
        .with_id(id)
        .with_arg("proj-1")
        .build()
        .unwrap()
}

fn ok_body(rpc_id: &str, payload: Value) -> String {
    response_body(&[data_envelope(rpc_id, &payload)])
}

/// **VALUE**: Verifies a single call round-trips through encoder, transport and decoder.
///
/// **WHY THIS MATTERS**: This is the path every notebook operation takes. The request
/// must carry the form body, query parameters and headers the endpoint insists on.
///
/// **BUG THIS CATCHES**: Would catch a missing `X-Same-Domain` header, cookies not sent,
/// or the anti-forgery token dropped from the body.
#[tokio::test]
async fn given_single_call_when_executing_then_decodes_payload_and_sends_expected_request() {
    // GIVEN: A server answering one envelope for rLM1Ne
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BATCH_PATH))
        .and(query_param("rpcids", "rLM1Ne"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(ok_body("rLM1Ne", json!(["Notebook", 3]))),
        )
        .expect(1)
        .mount(&server)
        .await;
    let schema = Schema::builder("Summary")
        .scalar("title", 0, ScalarType::String)
        .scalar("count", 1, ScalarType::Int)
        .build()
        .unwrap();

    // WHEN: Executing
    let record = fixed_client(&server)
        .execute(&call("rLM1Ne"), &schema)
        .await
        .unwrap();

    // THEN: Decoded fields, and the request carried the session
    assert_eq!(record.str("title"), Some("Notebook"));
    assert_eq!(record.i64("count"), Some(3));

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let header = |name: &str| {
        request
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    assert_eq!(header("x-same-domain").as_deref(), Some("1"));
    assert!(header("cookie").unwrap().contains("SID=sid-value"));
    assert!(header("content-type")
        .unwrap()
        .starts_with("application/x-www-form-urlencoded"));

    let query: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
    assert!(query.iter().any(|(k, v)| k == "rt" && v == "c"));
    assert!(query.iter().any(|(k, _)| k == "_reqid"));

    let form: Vec<(String, String)> = form_urlencoded::parse(&request.body).into_owned().collect();
    assert!(form.iter().any(|(k, v)| k == "at" && v == STALE_TOKEN));
    let freq = form.iter().find(|(k, _)| k == "f.req").map(|(_, v)| v).unwrap();
    let freq: Value = serde_json::from_str(freq).unwrap();
    assert_eq!(freq[0][0][0], json!("rLM1Ne"));
    assert_eq!(freq[0][0][1], json!("[\"proj-1\"]"));
}

/// **VALUE**: Verifies envelopes for other ids in the same stream are ignored.
///
/// **WHY THIS MATTERS**: The service sometimes piggybacks unrelated envelopes. A client
/// that takes the first one returns the wrong notebook.
///
/// **BUG THIS CATCHES**: Would catch positional demultiplexing.
#[tokio::test]
async fn given_stream_with_foreign_envelope_first_when_executing_then_returns_own_payload() {
    // GIVEN: A's envelope precedes B's
    let server = MockServer::start().await;
    let body = response_body(&[
        data_envelope("A", &json!(["for A"])),
        data_envelope("B", &json!(["for B"])),
    ]);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    // WHEN: Executing B
    let raw = fixed_client(&server).execute_raw(&call("B")).await.unwrap();

    // THEN: B's payload
    assert_eq!(raw, json!(["for B"]));
}

#[tokio::test]
async fn given_batch_with_remote_error_when_executing_then_results_are_per_call() {
    let server = MockServer::start().await;
    let body = response_body(&[
        data_envelope("A", &json!([1])),
        error_envelope("B", 5),
    ]);
    Mock::given(method("POST"))
        .and(query_param("rpcids", "A,B"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let results = fixed_client(&server)
        .execute_batch(&[call("A"), call("B")])
        .await
        .unwrap();

    assert_eq!(results[0].as_ref().unwrap(), &json!([1]));
    assert!(matches!(
        results[1],
        Err(RpcError::Remote { code: 5, .. })
    ));
}

/// **VALUE**: Verifies transient gateway errors are retried until success.
///
/// **WHY THIS MATTERS**: 503s from the front end are routine under load. Surfacing the
/// first one would make every long session flaky.
///
/// **BUG THIS CATCHES**: Would catch a retry loop that gives up after one attempt or
/// re-encodes the request with a new body.
#[tokio::test]
async fn given_two_503s_then_success_when_executing_then_retries_and_succeeds() {
    // GIVEN: Two 503s, then a payload
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_body("A", json!(["ok"]))))
        .mount(&server)
        .await;

    // WHEN: Executing
    let raw = fixed_client(&server).execute_raw(&call("A")).await.unwrap();

    // THEN: Three identical requests, payload returned
    assert_eq!(raw, json!(["ok"]));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].body, requests[2].body);
}

#[tokio::test]
async fn given_persistent_503_when_executing_then_fails_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let error = fixed_client(&server)
        .execute_raw(&call("A"))
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), Some(503));
    assert_eq!(error.rpc_id(), Some("A"));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn given_404_when_executing_then_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>Not Found</html>"))
        .mount(&server)
        .await;

    let error = fixed_client(&server)
        .execute_raw(&call("A"))
        .await
        .unwrap_err();

    assert_eq!(error.error_category(), "client_error");
    assert!(matches!(
        error,
        RpcError::Transport { body_snippet: Some(ref body), .. } if body.contains("Not Found")
    ));
    assert_eq!(request_count(&server).await, 1);
}

/// **VALUE**: Verifies a truncated stream fails as a framing error and is not retried.
///
/// **WHY THIS MATTERS**: A protocol violation will not fix itself on retry. Retrying only
/// multiplies the load and hides the real problem behind a delay.
///
/// **BUG THIS CATCHES**: Would catch framing errors classified as retryable transport errors.
#[tokio::test]
async fn given_truncated_chunk_when_executing_then_returns_framing_error_once() {
    // GIVEN: A chunk declaring more bytes than the body holds
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(")]}'\n\n500\n[[\"wrb.fr\""))
        .mount(&server)
        .await;

    // WHEN: Executing
    let error = fixed_client(&server)
        .execute_raw(&call("A"))
        .await
        .unwrap_err();

    // THEN: Framing error naming the call, one request
    match &error {
        RpcError::Framing { rpc_id, message, .. } => {
            assert_eq!(rpc_id.as_deref(), Some("A"));
            assert!(message.contains("declared 500 bytes"), "{message}");
        }
        other => panic!("Expected Framing, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn given_response_without_own_envelope_when_executing_then_returns_framing_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_body("other", json!([]))))
        .mount(&server)
        .await;

    let error = fixed_client(&server)
        .execute_raw(&call("A"))
        .await
        .unwrap_err();

    assert_eq!(error.error_category(), "framing");
    assert_eq!(error.rpc_id(), Some("A"));
}

/// **VALUE**: Verifies cancellation aborts an in-flight exchange promptly.
///
/// **WHY THIS MATTERS**: The CLI cancels on Ctrl-C. Waiting out a slow response (or the
/// whole retry schedule) would leave the user staring at a frozen terminal.
///
/// **BUG THIS CATCHES**: Would catch a token that is only checked between attempts.
#[tokio::test]
async fn given_slow_response_when_cancelled_then_returns_cancelled_quickly() {
    // GIVEN: A response delayed far beyond the test's patience
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ok_body("A", json!([])))
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;
    let client = fixed_client(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    // WHEN: Executing with the token
    let started = Instant::now();
    let result = client
        .execute_raw_cancellable(&call("A"), &cancel)
        .await;

    // THEN: Cancelled, well before the delayed response
    assert!(matches!(result, Err(RpcError::Cancelled { .. })));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn given_cancelled_token_when_executing_then_sends_nothing() {
    let server = MockServer::start().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = fixed_client(&server)
        .execute_raw_cancellable(&call("A"), &cancel)
        .await;

    assert!(matches!(result, Err(RpcError::Cancelled { .. })));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn given_payload_of_wrong_shape_when_executing_then_returns_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("f.req"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_body("A", json!([42]))))
        .mount(&server)
        .await;
    let schema = Schema::builder("Named")
        .scalar("name", 0, ScalarType::String)
        .build()
        .unwrap();

    let error = fixed_client(&server)
        .execute(&call("A"), &schema)
        .await
        .unwrap_err();

    assert_eq!(error.error_category(), "schema_mismatch");
    assert!(!error.is_retryable());
}

/// **VALUE**: Verifies a request that keeps timing out is retried, then surfaces as a
/// timeout transport error.
///
/// **WHY THIS MATTERS**: Slow responses are the common network failure against this
/// service. They must get the same bounded backoff as 5xx answers.
///
/// **BUG THIS CATCHES**: Would catch timeouts treated as final on the first attempt,
/// retried without bound, or reported without the timeout flag.
#[tokio::test]
async fn given_responses_slower_than_timeout_when_executing_then_retries_then_reports_timeout() {
    // GIVEN: A server that answers after the client timeout, and one retry allowed
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ok_body("A", json!([])))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let mut config = test_config(&server);
    config.timeout_secs = 1;
    config.retry.max_retries = 1;
    let client = BatchClient::new(&config, Arc::new(Session::fixed(stale_credentials()))).unwrap();

    // WHEN: Executing
    let error = client.execute_raw(&call("A")).await.unwrap_err();

    // THEN: One attempt plus one retry, ending in a timeout
    assert!(
        matches!(error, RpcError::Transport { is_timeout: true, .. }),
        "Expected timeout, got {error:?}"
    );
    assert_eq!(request_count(&server).await, 2);
}

/// **VALUE**: Verifies request diagnostics never carry the anti-forgery token.
///
/// **WHY THIS MATTERS**: Diagnostics go to the debug log. The token is a live
/// credential and is kept redacted everywhere else.
///
/// **BUG THIS CATCHES**: Would catch the preview being taken over the whole form body,
/// whose `at` field holds the token.
#[tokio::test]
async fn given_diagnostics_enabled_when_executing_then_request_preview_omits_token() {
    // GIVEN: A client recording diagnostics, with a recognisable token
    const TOKEN: &str = "SECRET-ANTI-FORGERY-TOKEN";
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_string(ok_body("A", json!([]))))
        .expect(1)
        .mount(&server)
        .await;
    let sink = Arc::new(MemorySink::new());
    let client = BatchClient::with_diagnostics(
        &test_config(&server),
        Arc::new(Session::fixed(Credentials::new(TOKEN, TEST_COOKIES))),
        Diagnostics::with_sink(sink.clone()),
    )
    .unwrap();

    // WHEN: Executing one call
    client.execute_raw(&call("A")).await.unwrap();

    // THEN: The request was previewed, without the token
    let previews: Vec<String> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            DiagnosticEvent::RequestEncoded { body_preview, .. } => Some(body_preview),
            _ => None,
        })
        .collect();
    assert_eq!(previews.len(), 1);
    assert!(previews[0].contains("generic"));
    assert!(!previews[0].contains(TOKEN));
}
