//! Batch RPC client core.
//!
//! Layers, leaves first:
//!
//! - [`session`]: credential triple, single-flight refresh
//! - [`encoder`]: `Call` batches to form bodies
//! - [`transport`]: HTTP exchange, de-framing, envelope demux, retry
//! - [`decoder`]: schema-driven positional JSON decoding
//!
//! [`BatchClient`] ties them together behind `execute` / `execute_raw`;
//! [`notebook`] is a thin domain client on top.

pub mod batch_client;
pub mod config;
pub mod decoder;
pub mod diagnostics;
pub mod encoder;
pub mod error;
pub mod notebook;
pub mod session;
pub mod transport;

pub use batch_client::BatchClient;
pub use config::ClientConfig;
pub use decoder::{PositionalMessage, decode, decode_message};
pub use diagnostics::{DiagnosticEvent, DiagnosticSink, Diagnostics};
pub use error::{ConfigError, CoreError, DecodeError, RpcError};
pub use session::{CredentialProvider, Credentials, Session};

pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests;

pub const DEFAULT_HOST: &str = "notebooklm.google.com";
pub const DEFAULT_BASE_URL: &str = const_format::concatcp!("https://", DEFAULT_HOST);
pub const DEFAULT_BATCH_PATH: &str = "/_/LabsTailwindUi/data/batchexecute";
