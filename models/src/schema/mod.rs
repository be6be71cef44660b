//! Positional schemas.
//!
//! A [`Schema`] is an inspectable table mapping array positions to named,
//! typed fields. The decoder walks it against a JSON array; adding a field
//! means adding a row, not touching decoding code.

pub mod builder;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Primitive type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    /// A JSON number with no fractional part that fits in `i64`.
    Int,
    /// Any JSON number.
    Float,
    Bool,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::String => "string",
            ScalarType::Int => "integer",
            ScalarType::Float => "number",
            ScalarType::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Small-integer to symbolic-name mapping for enum fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumTable {
    name: String,
    values: BTreeMap<i64, String>,
}

impl EnumTable {
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (i64, N)>,
    ) -> Self {
        Self {
            name: name.into(),
            values: entries
                .into_iter()
                .map(|(number, label)| (number, label.into()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, number: i64) -> Option<&str> {
        self.values.get(&number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What a field holds. Nested schemas and enum tables live inside the
/// variants that need them, so they are present exactly when required.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarType),
    Message(Arc<Schema>),
    RepeatedScalar(ScalarType),
    RepeatedMessage(Arc<Schema>),
    Enum(Arc<EnumTable>),
}

impl FieldKind {
    /// Short description used in mismatch errors.
    pub fn describe(&self) -> String {
        match self {
            FieldKind::Scalar(scalar) => scalar.to_string(),
            FieldKind::Message(schema) => format!("message {}", schema.name()),
            FieldKind::RepeatedScalar(scalar) => format!("array of {scalar}"),
            FieldKind::RepeatedMessage(schema) => format!("array of message {}", schema.name()),
            FieldKind::Enum(table) => format!("enum {}", table.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub index: usize,
    pub kind: FieldKind,
}

/// Ordered set of field specs, unique by index and by name.
///
/// Fields are kept sorted by index. Construct through
/// [`SchemaBuilder`](builder::SchemaBuilder), which enforces uniqueness.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> builder::SchemaBuilder {
        builder::SchemaBuilder::new(name)
    }

    /// Message name, used in diagnostics and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_at(&self, index: usize) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.index == index)
    }

    /// Highest declared index, `None` for an empty schema.
    pub fn max_index(&self) -> Option<usize> {
        self.fields.last().map(|field| field.index)
    }
}
