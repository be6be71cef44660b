//! Pure data structures for the batch RPC client.
//!
//! Models carry validation but no I/O and no protocol logic:
//!
//! - [`Call`] / [`CallBuilder`]: one logical RPC invocation
//! - [`ArgValue`]: the positional argument tree
//! - [`Schema`] / [`SchemaBuilder`]: position-to-field tables for decoding
//! - [`Record`] / [`FieldValue`]: what the decoder produces
//!
//! `rpc-core` operates on these; nothing here knows about HTTP or sessions.

pub mod arg;
pub mod call;
pub mod error;
pub mod record;
pub mod schema;

pub use arg::ArgValue;
pub use call::Call;
pub use call::builder::CallBuilder;
pub use common::ErrorLocation;
pub use error::model_error::ModelError;
pub use record::{EnumValue, FieldValue, Record};
pub use schema::builder::SchemaBuilder;
pub use schema::{EnumTable, FieldKind, FieldSpec, ScalarType, Schema};

#[cfg(test)]
mod tests;
