use crate::helpers::{data_envelope, fixed_client, response_body};

use rpc_core::notebook::{NotebookClient, ShareOption, SourceStatus, rpc_ids};

use serde_json::{Value, json};
use url::form_urlencoded;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_rpc(server: &MockServer, rpc_id: &str, payload: Value) {
    Mock::given(method("POST"))
        .and(query_param("rpcids", rpc_id))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(response_body(&[data_envelope(rpc_id, &payload)])),
        )
        .mount(server)
        .await;
}

/// Decoded `f.req` arguments of the first request the server saw.
async fn sent_args(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    let freq = form_urlencoded::parse(&requests[0].body)
        .find(|(key, _)| key == "f.req")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    let envelope: Value = serde_json::from_str(&freq).unwrap();
    serde_json::from_str(envelope[0][0][1].as_str().unwrap()).unwrap()
}

/// **VALUE**: Verifies listing decodes projects with their sources.
///
/// **WHY THIS MATTERS**: Listing is the first call every session makes; it exercises the
/// nested project/source layout end to end.
///
/// **BUG THIS CATCHES**: Would catch a layout index drift or wrong list arguments.
#[tokio::test]
async fn given_projects_when_listing_then_returns_typed_projects() {
    // GIVEN: One project with one source
    let server = MockServer::start().await;
    mount_rpc(
        &server,
        rpc_ids::LIST_RECENTLY_VIEWED_PROJECTS,
        json!([[[
            "Reading list",
            [[["s-1"], "Essay", [null, 900], [null, 1]]],
            "p-1",
            "📖"
        ]]]),
    )
    .await;
    let notebook = NotebookClient::new(fixed_client(&server));

    // WHEN: Listing
    let projects = notebook.list_recently_viewed_projects().await.unwrap();

    // THEN: Typed project, and the documented arguments were sent
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].title, "Reading list");
    assert_eq!(projects[0].sources[0].status, SourceStatus::Enabled);
    assert_eq!(sent_args(&server).await, json!([null, 1]));
}

#[tokio::test]
async fn given_text_source_when_adding_then_returns_new_id_and_sends_scope() {
    let server = MockServer::start().await;
    mount_rpc(&server, rpc_ids::ADD_SOURCES, json!([[[["src-9"], "Pasted"]]])).await;
    let notebook = NotebookClient::new(fixed_client(&server));

    let source_id = notebook
        .add_source_from_text("p-1", "body text", "Pasted")
        .await
        .unwrap();

    assert_eq!(source_id, "src-9");
    assert_eq!(
        sent_args(&server).await,
        json!([[[null, ["Pasted", "body text"], null, 2]], "p-1"])
    );
    let requests = server.received_requests().await.unwrap();
    assert!(requests[0]
        .url
        .query_pairs()
        .any(|(k, v)| k == "source-path" && v == "/notebook/p-1"));
}

#[tokio::test]
async fn given_notes_when_deleting_then_sends_nested_ids() {
    let server = MockServer::start().await;
    mount_rpc(&server, rpc_ids::DELETE_NOTES, json!([])).await;
    let notebook = NotebookClient::new(fixed_client(&server));

    notebook
        .delete_notes("p-1", &["n-1".to_string(), "n-2".to_string()])
        .await
        .unwrap();

    assert_eq!(sent_args(&server).await, json!([[[["n-1", "n-2"]]]]));
}

#[tokio::test]
async fn given_public_share_when_sharing_audio_then_returns_url() {
    let server = MockServer::start().await;
    mount_rpc(
        &server,
        rpc_ids::SHARE_AUDIO,
        json!([["https://notebooklm.google.com/share/xyz", "share-xyz"]]),
    )
    .await;
    let notebook = NotebookClient::new(fixed_client(&server));

    let share = notebook
        .share_audio("p-1", ShareOption::Public)
        .await
        .unwrap();

    assert_eq!(share.share_url, "https://notebooklm.google.com/share/xyz");
    assert!(share.is_public);
    assert_eq!(sent_args(&server).await, json!([[1], "p-1"]));
}
