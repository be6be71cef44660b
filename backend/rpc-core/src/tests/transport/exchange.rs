use crate::transport::error_body;

use reqwest::Client;

#[test]
fn given_readable_body_when_building_error_body_then_returns_it_unchanged() {
    assert_eq!(error_body("A", Ok("Service Unavailable".to_string())), "Service Unavailable");
}

/// **VALUE**: Verifies a failed read of an error body is reported, not replaced by "".
///
/// **WHY THIS MATTERS**: The body snippet is the only server-side context a transport
/// error carries. An empty snippet looks like the server said nothing.
///
/// **BUG THIS CATCHES**: Would catch the read error being swallowed into a default.
#[test]
fn given_failed_body_read_when_building_error_body_then_names_the_failure() {
    // GIVEN: A real reqwest error
    let read_error = Client::new().get("not a url").build().unwrap_err();

    // WHEN: Building the error body from it
    let body = error_body("A", Err(read_error));

    // THEN: The placeholder says the body was unreadable
    assert!(body.starts_with("<body unreadable: "));
    assert!(body.len() > "<body unreadable: >".len());
}
