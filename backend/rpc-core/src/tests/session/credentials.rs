use crate::error::RpcError;
use crate::session::env::{AUTH_TOKEN_ENV, BEARER_TOKEN_ENV, COOKIES_ENV};
use crate::session::{Credentials, EnvCredentials, parse_cookie_header};

use serial_test::serial;

#[test]
fn given_cookie_header_when_parsing_then_keeps_order_and_drops_fragments() {
    let cookies = parse_cookie_header(" SID=abc ; junk; HSID=def==; =orphan");

    let names: Vec<&str> = cookies.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["SID", "HSID"]);
    assert_eq!(cookies[1].1.expose(), "def==");
}

#[test]
fn given_credentials_when_building_cookie_header_then_round_trips() {
    let credentials = Credentials::new("token", "SID=abc; HSID=def");

    assert_eq!(credentials.cookie_header(), "SID=abc; HSID=def");
    assert_eq!(credentials.cookie("HSID").map(|c| c.expose()), Some("def"));
    assert!(credentials.cookie("APISID").is_none());
}

#[test]
fn given_empty_bearer_token_when_attaching_then_stays_absent() {
    let credentials = Credentials::new("token", "SID=abc").with_bearer_token("");

    assert!(credentials.bearer_token.is_none());
}

/// **VALUE**: Verifies secrets never reach Debug output.
///
/// **WHY THIS MATTERS**: Credentials are threaded through structs that get logged with
/// `{:?}` on failure. One careless log line would leak a live session.
///
/// **BUG THIS CATCHES**: Would catch a derived Debug on a field that holds raw strings.
#[test]
fn given_credentials_when_debug_formatted_then_no_secret_appears() {
    // GIVEN: Credentials with distinctive secret values
    let credentials =
        Credentials::new("at-secret-123", "SID=sid-secret-456").with_bearer_token("bearer-789");

    // WHEN: Debug formatting
    let debug = format!("{credentials:?}");

    // THEN: Cookie names visible, values not
    assert!(debug.contains("SID"));
    assert!(!debug.contains("at-secret-123"));
    assert!(!debug.contains("sid-secret-456"));
    assert!(!debug.contains("bearer-789"));
}

fn clear_env() {
    // SAFETY: env tests run under #[serial]
    unsafe {
        std::env::remove_var(AUTH_TOKEN_ENV);
        std::env::remove_var(COOKIES_ENV);
        std::env::remove_var(BEARER_TOKEN_ENV);
    }
}

#[test]
#[serial]
fn given_env_vars_when_reading_then_builds_credentials() {
    // GIVEN: All three variables set
    clear_env();
    // SAFETY: serialized with the other env tests
    unsafe {
        std::env::set_var(AUTH_TOKEN_ENV, " token-abc ");
        std::env::set_var(COOKIES_ENV, "SID=1; HSID=2");
        std::env::set_var(BEARER_TOKEN_ENV, "bearer");
    }

    // WHEN: Reading from the environment
    let credentials = EnvCredentials::from_env().unwrap();

    // THEN: Values trimmed and parsed
    assert_eq!(credentials.anti_forgery_token.expose(), "token-abc");
    assert_eq!(credentials.cookies.len(), 2);
    assert!(credentials.bearer_token.is_some());
    clear_env();
}

#[test]
#[serial]
fn given_missing_token_when_reading_env_then_returns_auth_expired() {
    clear_env();
    // SAFETY: serialized with the other env tests
    unsafe {
        std::env::set_var(COOKIES_ENV, "SID=1");
    }

    let result = EnvCredentials::from_env();

    match result.unwrap_err() {
        RpcError::AuthExpired { message, .. } => assert!(message.contains(AUTH_TOKEN_ENV)),
        other => panic!("Expected AuthExpired, got {other:?}"),
    }
    clear_env();
}

#[test]
#[serial]
fn given_cookie_var_without_pairs_when_reading_env_then_fails() {
    clear_env();
    // SAFETY: serialized with the other env tests
    unsafe {
        std::env::set_var(AUTH_TOKEN_ENV, "token");
        std::env::set_var(COOKIES_ENV, "no-pairs-here");
    }

    let result = EnvCredentials::from_env();

    assert!(matches!(result, Err(RpcError::AuthExpired { .. })));
    clear_env();
}
