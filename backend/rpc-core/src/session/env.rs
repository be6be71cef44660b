//! Credentials from the process environment.
//!
//! # Features
//! - Loads .env from cwd or executable directory
//! - `NLM_AUTH_TOKEN` (anti-forgery token) and `NLM_COOKIES` are required
//! - `NLM_BEARER_TOKEN` is optional
//! - As a provider, re-reads the environment with the .env file taking precedence

use crate::error::RpcError;
use crate::session::{CredentialProvider, Credentials};

use std::env;
use std::path::PathBuf;

use async_trait::async_trait;
use log::{debug, info, warn};

pub const AUTH_TOKEN_ENV: &str = "NLM_AUTH_TOKEN";
pub const COOKIES_ENV: &str = "NLM_COOKIES";
pub const BEARER_TOKEN_ENV: &str = "NLM_BEARER_TOKEN";

/// Result of attempting to load .env file.
#[derive(Debug)]
pub struct EnvLoadResult {
    /// Path to loaded .env file, if found.
    pub path: Option<PathBuf>,
    /// Whether any .env file was loaded.
    pub loaded: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl EnvCredentials {
    /// Load .env (if any) without overriding existing variables, then read credentials.
    pub fn load() -> Result<Credentials, RpcError> {
        let env_result = try_load_dotenv(false);
        if !env_result.loaded {
            debug!("No .env file found - will check existing environment variables");
        }
        Self::from_env()
    }

    /// Read credentials from environment variables only.
    pub fn from_env() -> Result<Credentials, RpcError> {
        let auth_token = required_var(AUTH_TOKEN_ENV)?;
        let cookies = required_var(COOKIES_ENV)?;

        let mut credentials = Credentials::new(auth_token, &cookies);
        if credentials.cookies.is_empty() {
            return Err(RpcError::auth_expired(format!(
                "{COOKIES_ENV} contains no name=value pairs"
            )));
        }

        match env::var(BEARER_TOKEN_ENV) {
            Ok(token) => credentials = credentials.with_bearer_token(token),
            Err(env::VarError::NotPresent) => {}
            Err(env::VarError::NotUnicode(_)) => {
                warn!("Env var {BEARER_TOKEN_ENV} contains invalid unicode, ignoring");
            }
        }

        info!(
            "Loaded credentials from environment ({} cookies, bearer token {})",
            credentials.cookies.len(),
            if credentials.bearer_token.is_some() { "present" } else { "absent" }
        );
        Ok(credentials)
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn refresh(&self, current: &Credentials) -> Result<Credentials, RpcError> {
        try_load_dotenv(true);
        let fresh = Self::from_env()?;
        if &fresh == current {
            return Err(RpcError::auth_expired(format!(
                "environment credentials unchanged; update {AUTH_TOKEN_ENV} and {COOKIES_ENV}"
            )));
        }
        Ok(fresh)
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

fn required_var(name: &str) -> Result<String, RpcError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Ok(_) => Err(RpcError::auth_expired(format!("{name} is empty"))),
        Err(env::VarError::NotPresent) => Err(RpcError::auth_expired(format!("{name} is not set"))),
        Err(env::VarError::NotUnicode(_)) => Err(RpcError::auth_expired(format!(
            "{name} contains invalid unicode"
        ))),
    }
}

/// Attempts to load .env from known locations.
fn try_load_dotenv(override_existing: bool) -> EnvLoadResult {
    let loaded = if override_existing {
        dotenvy::dotenv_override()
    } else {
        dotenvy::dotenv()
    };
    if let Ok(path) = loaded {
        info!("Loaded .env from: {:?}", path);
        return EnvLoadResult { path: Some(path), loaded: true };
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let env_path = exe_dir.join(".env");
            if env_path.exists() {
                let result = if override_existing {
                    dotenvy::from_path_override(&env_path)
                } else {
                    dotenvy::from_path(&env_path)
                };
                match result {
                    Ok(_) => {
                        info!("Loaded .env from: {:?}", env_path);
                        return EnvLoadResult { path: Some(env_path), loaded: true };
                    }
                    Err(e) => {
                        warn!("Failed to parse .env at {:?}: {}", env_path, e);
                    }
                }
            }
        }
    }

    EnvLoadResult { path: None, loaded: false }
}
