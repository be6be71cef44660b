use crate::error::model_error::ModelError;
use crate::{EnumTable, ErrorLocation, FieldKind, FieldSpec, ScalarType, Schema};

use std::panic::Location;
use std::sync::Arc;

/// Builder for validated [`Schema`] tables.
///
/// ```
/// use models::{ScalarType, Schema};
///
/// let schema = Schema::builder("Note")
///     .scalar("id", 0, ScalarType::String)
///     .scalar("title", 1, ScalarType::String)
///     .build()
///     .unwrap();
/// assert_eq!(schema.max_index(), Some(1));
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, index: usize, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            index,
            kind,
        });
        self
    }

    pub fn scalar(self, name: impl Into<String>, index: usize, scalar: ScalarType) -> Self {
        self.field(name, index, FieldKind::Scalar(scalar))
    }

    pub fn repeated_scalar(self, name: impl Into<String>, index: usize, scalar: ScalarType) -> Self {
        self.field(name, index, FieldKind::RepeatedScalar(scalar))
    }

    pub fn message(self, name: impl Into<String>, index: usize, schema: Arc<Schema>) -> Self {
        self.field(name, index, FieldKind::Message(schema))
    }

    pub fn repeated_message(
        self,
        name: impl Into<String>,
        index: usize,
        schema: Arc<Schema>,
    ) -> Self {
        self.field(name, index, FieldKind::RepeatedMessage(schema))
    }

    pub fn enumeration(self, name: impl Into<String>, index: usize, table: Arc<EnumTable>) -> Self {
        self.field(name, index, FieldKind::Enum(table))
    }

    /// Build the Schema with validation.
    #[track_caller]
    pub fn build(mut self) -> Result<Schema, ModelError> {
        if self.name.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Schema name cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.fields.sort_by_key(|field| field.index);

        for pair in self.fields.windows(2) {
            if pair[0].index == pair[1].index {
                return Err(ModelError::Validation {
                    message: format!(
                        "Duplicate index {} in schema {}: '{}' and '{}'",
                        pair[0].index, self.name, pair[0].name, pair[1].name
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        for (position, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(ModelError::Validation {
                    message: format!(
                        "Field at index {} in schema {} has no name",
                        field.index, self.name
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            if self.fields[..position]
                .iter()
                .any(|earlier| earlier.name == field.name)
            {
                return Err(ModelError::Validation {
                    message: format!("Duplicate field name '{}' in schema {}", field.name, self.name),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        Ok(Schema {
            name: self.name,
            fields: self.fields,
        })
    }
}
