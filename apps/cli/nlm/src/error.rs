use common::ErrorLocation;

use rpc_core::CoreError;

use thiserror::Error;

/// Errors surfaced by the `nlm` binary.
///
/// Library errors pass through unchanged; the binary prints the `Display`
/// text, location included, and exits non-zero.
#[derive(Debug, Error)]
pub enum NlmError {
    /// Error from this App
    #[error("Nlm Error: {message} {location}")]
    Nlm {
        message: String,
        location: ErrorLocation,
    },

    /// Command line could not be understood
    #[error("Usage Error: {message} {location}")]
    Usage {
        message: String,
        location: ErrorLocation,
    },

    /// Error from rpc-core operations (config, transport, decoding)
    #[error(transparent)]
    Core(#[from] CoreError),
}
