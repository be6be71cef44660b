pub mod builder;

use crate::ArgValue;
use crate::call::builder::CallBuilder;

/// One logical RPC invocation.
///
/// Immutable once built; a retried call is the same `Call` sent again.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub(crate) id: String,
    pub(crate) args: Vec<ArgValue>,
    pub(crate) scope_key: Option<String>,
}

impl Call {
    pub fn builder() -> CallBuilder {
        CallBuilder::default()
    }

    /// Opaque RPC identifier, e.g. `wXbhsf`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    /// Routes the call to a session-scoped execution context (a notebook).
    pub fn scope_key(&self) -> Option<&str> {
        self.scope_key.as_deref()
    }
}
