//! Session credentials shared by every in-flight call.
//!
//! # Concurrency
//! - Readers take a cheap snapshot (`Arc<Credentials>` plus a generation number)
//! - Refresh is single-flight: callers pass the generation they saw rejected,
//!   and only the first caller per generation reaches the provider
//! - A failed refresh poisons that generation until [`Session::replace`]

pub mod env;
pub mod page_token;
pub mod provider;

pub use env::EnvCredentials;
pub use page_token::PageTokenProvider;
pub use provider::{CredentialProvider, StaticCredentials};

use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::error::RpcError;

use common::RedactedSecret;

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock};

/// Bearer token, cookie jar and anti-forgery token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub bearer_token: Option<RedactedSecret>,
    /// Name/value pairs in the order they were supplied.
    pub cookies: Vec<(String, RedactedSecret)>,
    pub anti_forgery_token: RedactedSecret,
}

impl Credentials {
    pub fn new(anti_forgery_token: impl Into<RedactedSecret>, cookie_header: &str) -> Self {
        Self {
            bearer_token: None,
            cookies: parse_cookie_header(cookie_header),
            anti_forgery_token: anti_forgery_token.into(),
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<RedactedSecret>) -> Self {
        let token = token.into();
        self.bearer_token = (!token.is_empty()).then_some(token);
        self
    }

    /// `Cookie` header value, e.g. `SID=abc; HSID=def`.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={}", value.expose()))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn cookie(&self, name: &str) -> Option<&RedactedSecret> {
        self.cookies
            .iter()
            .find(|(cookie, _)| cookie == name)
            .map(|(_, value)| value)
    }
}

/// Split a `Cookie` header into ordered pairs. Fragments without `=` are dropped.
pub fn parse_cookie_header(header: &str) -> Vec<(String, RedactedSecret)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), RedactedSecret::new(value.trim())))
        })
        .collect()
}

/// Credentials as seen by one exchange.
#[derive(Debug, Clone)]
pub struct CredentialSnapshot {
    pub credentials: Arc<Credentials>,
    /// Bumped on every successful refresh or replacement.
    pub generation: u64,
}

#[derive(Debug)]
struct SessionState {
    credentials: Arc<Credentials>,
    generation: u64,
    failed_generation: Option<u64>,
}

pub struct Session {
    state: RwLock<SessionState>,
    refresh_gate: Mutex<()>,
    provider: Arc<dyn CredentialProvider>,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(credentials: Credentials, provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            state: RwLock::new(SessionState {
                credentials: Arc::new(credentials),
                generation: 0,
                failed_generation: None,
            }),
            refresh_gate: Mutex::new(()),
            provider,
            diagnostics: Diagnostics::disabled(),
        }
    }

    /// Session with no way to refresh; any auth rejection is final.
    pub fn fixed(credentials: Credentials) -> Self {
        Self::new(credentials, Arc::new(StaticCredentials))
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn current(&self) -> CredentialSnapshot {
        let state = self.state.read().await;
        CredentialSnapshot {
            credentials: Arc::clone(&state.credentials),
            generation: state.generation,
        }
    }

    /// Refresh the credentials currently held.
    pub async fn refresh(&self) -> Result<CredentialSnapshot, RpcError> {
        let generation = self.current().await.generation;
        self.refresh_after(generation).await
    }

    /// Refresh credentials known to be rejected at `stale_generation`.
    ///
    /// If another caller already refreshed past that generation, its result is
    /// returned without contacting the provider again.
    pub async fn refresh_after(&self, stale_generation: u64) -> Result<CredentialSnapshot, RpcError> {
        let _gate = self.refresh_gate.lock().await;

        let current = {
            let state = self.state.read().await;
            if state.generation != stale_generation {
                debug!(
                    "Refresh for generation {stale_generation} coalesced into generation {}",
                    state.generation
                );
                self.diagnostics.emit(|| DiagnosticEvent::RefreshCoalesced {
                    generation: state.generation,
                });
                return Ok(CredentialSnapshot {
                    credentials: Arc::clone(&state.credentials),
                    generation: state.generation,
                });
            }
            if state.failed_generation == Some(stale_generation) {
                return Err(RpcError::auth_expired(format!(
                    "credential refresh via {} already failed; re-authenticate",
                    self.provider.name()
                )));
            }
            Arc::clone(&state.credentials)
        };

        info!(
            "Refreshing session credentials via {} (generation {stale_generation})",
            self.provider.name()
        );
        self.diagnostics.emit(|| DiagnosticEvent::RefreshStarted {
            provider: self.provider.name(),
            generation: stale_generation,
        });

        match self.provider.refresh(&current).await {
            Ok(credentials) => {
                let mut state = self.state.write().await;
                state.credentials = Arc::new(credentials);
                state.generation += 1;
                state.failed_generation = None;
                info!("Session credentials refreshed (generation {})", state.generation);
                Ok(CredentialSnapshot {
                    credentials: Arc::clone(&state.credentials),
                    generation: state.generation,
                })
            }
            Err(e) => {
                warn!("Credential refresh via {} failed: {e}", self.provider.name());
                if !e.is_retryable() {
                    self.state.write().await.failed_generation = Some(stale_generation);
                }
                Err(match e {
                    RpcError::AuthExpired { .. } => e,
                    other => RpcError::auth_expired(format!(
                        "credential refresh via {} failed: {other}",
                        self.provider.name()
                    )),
                })
            }
        }
    }

    /// Install credentials obtained out-of-band (e.g. after an interactive login).
    pub async fn replace(&self, credentials: Credentials) -> CredentialSnapshot {
        let _gate = self.refresh_gate.lock().await;
        let mut state = self.state.write().await;
        state.credentials = Arc::new(credentials);
        state.generation += 1;
        state.failed_generation = None;
        info!("Session credentials replaced (generation {})", state.generation);
        CredentialSnapshot {
            credentials: Arc::clone(&state.credentials),
            generation: state.generation,
        }
    }
}
