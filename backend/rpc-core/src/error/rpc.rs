//! Error taxonomy for batch RPC execution.
//!
//! Key design decisions:
//! - HTTP status codes stored directly (not parsed from strings)
//! - `is_retryable()` uses error categories and status codes, not message content
//! - Every variant carries the RPC id(s) it concerns, where known
//! - `#[track_caller]` constructors capture an ErrorLocation

use crate::error::decode::DecodeError;

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

/// Longest response body fragment kept on a transport error.
pub const BODY_SNIPPET_LIMIT: usize = 512;

#[derive(Debug, ThisError)]
pub enum RpcError {
    /// An argument cannot be represented on the wire. Never retried.
    #[error("Encoding Error: rpc '{rpc_id}' argument {path}: {message} {location}")]
    Encoding {
        rpc_id: String,
        path: String,
        message: String,
        location: ErrorLocation,
    },

    /// HTTP or network failure, surfaced once retries are exhausted.
    #[error("Transport Error: rpc '{rpc_id}': {message} {location}")]
    Transport {
        rpc_id: String,
        message: String,
        status_code: Option<HttpStatusCode>,
        body_snippet: Option<String>,
        is_timeout: bool,
        is_connection: bool,
        location: ErrorLocation,
    },

    /// The response stream broke the chunk protocol. Never retried.
    #[error("Framing Error: {message} at byte {offset} {location}")]
    Framing {
        rpc_id: Option<String>,
        message: String,
        offset: usize,
        location: ErrorLocation,
    },

    /// Credentials rejected and no refresh could fix it.
    #[error("Auth Expired Error: {message} {location}")]
    AuthExpired {
        rpc_id: Option<String>,
        message: String,
        location: ErrorLocation,
    },

    /// The service answered the envelope with an error code instead of a payload.
    #[error("Remote Error: rpc '{rpc_id}' failed with code {code} {location}")]
    Remote {
        rpc_id: String,
        code: i64,
        location: ErrorLocation,
    },

    #[error("Cancelled Error: rpc '{rpc_id}' cancelled by caller {location}")]
    Cancelled {
        rpc_id: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl RpcError {
    #[track_caller]
    pub fn encoding(
        rpc_id: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RpcError::Encoding {
            rpc_id: rpc_id.into(),
            path: path.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn framing(message: impl Into<String>, offset: usize) -> Self {
        RpcError::Framing {
            rpc_id: None,
            message: message.into(),
            offset,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn auth_expired(message: impl Into<String>) -> Self {
        RpcError::AuthExpired {
            rpc_id: None,
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn cancelled(rpc_id: impl Into<String>) -> Self {
        RpcError::Cancelled {
            rpc_id: rpc_id.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn remote(rpc_id: impl Into<String>, code: i64) -> Self {
        RpcError::Remote {
            rpc_id: rpc_id.into(),
            code,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Create from reqwest error with proper categorization.
    #[track_caller]
    pub fn from_reqwest(rpc_id: impl Into<String>, error: &reqwest::Error) -> Self {
        // Check for specific error types BEFORE converting to string
        let is_timeout = error.is_timeout();
        let is_connection = error.is_connect() || error.is_request() || error.is_body();

        RpcError::Transport {
            rpc_id: rpc_id.into(),
            message: error.to_string(),
            status_code: error.status().map(|s| HttpStatusCode(s.as_u16())),
            body_snippet: None,
            is_timeout,
            is_connection,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Create from an HTTP response with a non-2xx status.
    #[track_caller]
    pub fn from_http_response(rpc_id: impl Into<String>, status_code: u16, body: &str) -> Self {
        let status_code = HttpStatusCode(status_code);
        RpcError::Transport {
            rpc_id: rpc_id.into(),
            message: format!("HTTP {status_code}"),
            status_code: Some(status_code),
            body_snippet: Some(snippet(body)),
            is_timeout: false,
            is_connection: false,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Attach the RPC id to errors raised below the layer that knows it.
    pub fn with_rpc_id(mut self, id: &str) -> Self {
        match &mut self {
            RpcError::Framing { rpc_id, .. } | RpcError::AuthExpired { rpc_id, .. }
                if rpc_id.is_none() =>
            {
                *rpc_id = Some(id.to_string());
            }
            _ => {}
        }
        self
    }

    /// Check if this error is retryable based on error category, NOT string content.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport {
                is_timeout,
                is_connection,
                status_code,
                ..
            } => *is_timeout || *is_connection || status_code.is_some_and(|s| s.is_retryable()),

            RpcError::Encoding { .. } => false,
            RpcError::Framing { .. } => false,
            RpcError::AuthExpired { .. } => false,
            RpcError::Remote { .. } => false,
            RpcError::Cancelled { .. } => false,
            RpcError::Decode(_) => false,
        }
    }

    /// Get error category for diagnostics.
    pub fn error_category(&self) -> &'static str {
        match self {
            RpcError::Encoding { .. } => "encoding",
            RpcError::Transport { is_timeout: true, .. } => "timeout",
            RpcError::Transport { is_connection: true, .. } => "connection",
            RpcError::Transport { status_code: Some(s), .. } if s.is_client_error() => {
                "client_error"
            }
            RpcError::Transport { status_code: Some(s), .. } if s.is_server_error() => {
                "server_error"
            }
            RpcError::Transport { .. } => "transport",
            RpcError::Framing { .. } => "framing",
            RpcError::AuthExpired { .. } => "auth_expired",
            RpcError::Remote { .. } => "remote",
            RpcError::Cancelled { .. } => "cancelled",
            RpcError::Decode(_) => "schema_mismatch",
        }
    }

    /// Get the RPC id if applicable.
    pub fn rpc_id(&self) -> Option<&str> {
        match self {
            RpcError::Encoding { rpc_id, .. }
            | RpcError::Transport { rpc_id, .. }
            | RpcError::Remote { rpc_id, .. }
            | RpcError::Cancelled { rpc_id, .. } => Some(rpc_id),
            RpcError::Framing { rpc_id, .. } | RpcError::AuthExpired { rpc_id, .. } => {
                rpc_id.as_deref()
            }
            RpcError::Decode(_) => None,
        }
    }

    /// Get HTTP status code if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RpcError::Transport { status_code, .. } => status_code.map(|s| s.0),
            _ => None,
        }
    }
}

/// Truncate a response body for error context, on a char boundary.
pub(crate) fn snippet(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_SNIPPET_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
