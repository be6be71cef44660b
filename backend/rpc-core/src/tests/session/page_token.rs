use crate::config::ClientConfig;
use crate::session::PageTokenProvider;
use crate::session::page_token::extract_anti_forgery_token;

/// **VALUE**: Verifies the token is found inside the page's bootstrap script.
///
/// **WHY THIS MATTERS**: The page is megabytes of minified script. The token sits in a
/// `WIZ_global_data` object among hundreds of similarly shaped keys.
///
/// **BUG THIS CATCHES**: Would catch a greedy pattern that runs past the closing quote.
#[test]
fn given_app_page_when_extracting_token_then_returns_value() {
    // GIVEN: A fragment of bootstrap data
    let page = r#"<script>window.WIZ_global_data = {"FdrFJe":"-123","SNlM0e":"AKEyXz:1700000000000","cfb2h":"boq_labs"};</script>"#;

    // WHEN: Extracting
    let token = extract_anti_forgery_token(page);

    // THEN: Exactly the token value
    assert_eq!(token, Some("AKEyXz:1700000000000"));
}

#[test]
fn given_login_page_when_extracting_token_then_returns_none() {
    let page = "<html><body>accounts.google.com/ServiceLogin</body></html>";

    assert_eq!(extract_anti_forgery_token(page), None);
}

#[test]
fn given_config_when_building_provider_then_joins_app_path() {
    let mut config = ClientConfig::default();
    config.endpoint.base_url = "https://example.test".to_string();
    config.endpoint.app_path = "/app".to_string();

    let provider = PageTokenProvider::from_config(&config).unwrap();

    assert_eq!(provider.page_url().as_str(), "https://example.test/app");
}
