//! Cross-cutting utilities shared by every crate in the workspace.
//!
//! Nothing in here knows about the batch protocol. It holds the pieces
//! that the error types, the credential store and the retry logic all
//! lean on:
//!
//! - [`ErrorLocation`]: file/line/column captured with `#[track_caller]`
//! - [`HttpStatusCode`]: status categorisation for retry and auth decisions
//! - [`RedactedSecret`]: credential material that never reaches a log line

pub mod error;
pub mod http_status;
pub mod redacted_secret;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use http_status::HttpStatusCode;
pub use redacted_secret::RedactedSecret;
