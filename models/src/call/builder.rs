use crate::error::model_error::ModelError;
use crate::{ArgValue, Call, ErrorLocation};

use std::panic::Location;

/// Builder for validated [`Call`] instances.
///
/// Arguments are positional: `with_arg` appends, `with_args` replaces the
/// whole list. Use [`ArgValue::Null`] for omitted slots.
#[derive(Debug, Default)]
pub struct CallBuilder {
    id: Option<String>,
    args: Vec<ArgValue>,
    scope_key: Option<String>,
}

impl CallBuilder {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<ArgValue>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args(mut self, args: Vec<ArgValue>) -> Self {
        self.args = args;
        self
    }

    pub fn with_scope_key(mut self, scope_key: impl Into<String>) -> Self {
        self.scope_key = Some(scope_key.into());
        self
    }

    /// Build the Call with validation.
    ///
    /// The id ends up comma-joined in the `rpcids` query parameter, so it may
    /// not contain commas or whitespace.
    #[track_caller]
    pub fn build(self) -> Result<Call, ModelError> {
        let id = self.id.ok_or_else(|| ModelError::Validation {
            message: String::from("RPC id is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if id.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("RPC id cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if id.contains(',') || id.chars().any(char::is_whitespace) {
            return Err(ModelError::Validation {
                message: format!("Invalid RPC id: {id:?}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(ref scope_key) = self.scope_key {
            if scope_key.is_empty() {
                return Err(ModelError::Validation {
                    message: String::from("Scope key cannot be empty"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        Ok(Call {
            id,
            args: self.args,
            scope_key: self.scope_key,
        })
    }
}
