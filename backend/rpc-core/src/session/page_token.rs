use crate::config::ClientConfig;
use crate::error::{ConfigError, CoreError, RpcError};
use crate::session::{CredentialProvider, Credentials};

use common::{ErrorLocation, HttpStatusCode, RedactedSecret};

use std::panic::Location;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, COOKIE};
use url::Url;

const TOKEN_PATTERN: &str = r#""SNlM0e":"(?P<token>[^"]+)""#;
const TOKEN_CAPTURE: &str = "token";
const PROVIDER_LABEL: &str = "page-token";

static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("valid regex pattern"))
}

/// Pull the anti-forgery token out of the application page's bootstrap data.
pub fn extract_anti_forgery_token(page: &str) -> Option<&str> {
    get_token_regex()
        .captures(page)
        .and_then(|caps| caps.name(TOKEN_CAPTURE))
        .map(|token| token.as_str())
}

/// Re-derives the anti-forgery token from the application page, keeping cookies.
///
/// Cookies outlive the token by a wide margin, so a rejected token can
/// usually be replaced without a new login. A page with no token (a login
/// redirect) means the cookies are gone too.
#[derive(Debug, Clone)]
pub struct PageTokenProvider {
    client: Client,
    page_url: Url,
}

impl PageTokenProvider {
    pub fn new(page_url: Url, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::from_reqwest(PROVIDER_LABEL, &e))?;
        Ok(Self { client, page_url })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, CoreError> {
        let page_url = Url::parse(&config.endpoint.base_url)
            .and_then(|base| base.join(&config.endpoint.app_path))
            .map_err(|e| ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Invalid application page URL: {e}"),
            })?;
        Ok(Self::new(page_url, config.timeout())?)
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }
}

#[async_trait]
impl CredentialProvider for PageTokenProvider {
    async fn refresh(&self, current: &Credentials) -> Result<Credentials, RpcError> {
        debug!("Fetching anti-forgery token from {}", self.page_url);

        let mut request = self
            .client
            .get(self.page_url.clone())
            .header(COOKIE, current.cookie_header());
        if let Some(token) = &current.bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.expose()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RpcError::from_reqwest(PROVIDER_LABEL, &e))?;

        let status = HttpStatusCode(response.status().as_u16());
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::from_reqwest(PROVIDER_LABEL, &e))?;

        if status.is_auth_rejection() {
            return Err(RpcError::auth_expired(format!(
                "application page rejected cookies with HTTP {status}"
            )));
        }
        if !status.is_success() {
            return Err(RpcError::from_http_response(
                PROVIDER_LABEL,
                status.0,
                &body,
            ));
        }

        let token = extract_anti_forgery_token(&body).ok_or_else(|| {
            RpcError::auth_expired("anti-forgery token not found in application page; log in again")
        })?;

        info!("Re-derived anti-forgery token ({} chars)", token.len());
        Ok(Credentials {
            anti_forgery_token: RedactedSecret::new(token),
            ..current.clone()
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER_LABEL
    }
}
