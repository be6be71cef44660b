use crate::error::RpcError;
use crate::session::Credentials;

use async_trait::async_trait;

/// Source of fresh credentials when the service rejects the current ones.
///
/// Called at most once per rejected generation; [`Session`](super::Session)
/// handles coalescing, implementations only fetch.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn refresh(&self, current: &Credentials) -> Result<Credentials, RpcError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// No refresh mechanism: credentials came from an interactive login.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCredentials;

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn refresh(&self, _current: &Credentials) -> Result<Credentials, RpcError> {
        Err(RpcError::auth_expired(
            "no credential refresh mechanism configured; log in again",
        ))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
