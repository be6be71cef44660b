//! Decoded records.

use serde_json::Value;

/// Value of an enum field.
///
/// Numbers missing from the table are kept as `Unknown` rather than
/// rejected: the service adds new numbers over time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumValue {
    Known { number: i64, name: String },
    Unknown(i64),
}

impl EnumValue {
    pub fn number(&self) -> i64 {
        match self {
            EnumValue::Known { number, .. } => *number,
            EnumValue::Unknown(number) => *number,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            EnumValue::Known { name, .. } => Some(name),
            EnumValue::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, EnumValue::Known { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// `None` when the message was absent or `null`.
    Message(Option<Record>),
    Repeated(Vec<FieldValue>),
    Messages(Vec<Record>),
    Enum(EnumValue),
}

/// A decoded positional message: named fields in schema order plus any
/// trailing source elements the schema did not declare.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema_name: String,
    fields: Vec<(String, FieldValue)>,
    trailing: Vec<Value>,
}

impl Record {
    pub fn new(
        schema_name: impl Into<String>,
        fields: Vec<(String, FieldValue)>,
        trailing: Vec<Value>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            fields,
            trailing,
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Source elements past the highest declared index, untouched.
    pub fn trailing(&self) -> &[Value] {
        &self.trailing
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Move a field out of the record.
    pub fn take(&mut self, name: &str) -> Option<FieldValue> {
        let position = self.fields.iter().position(|(field, _)| field == name)?;
        Some(self.fields.remove(position).1)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Floats as-is, integers widened.
    pub fn f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            FieldValue::Float(value) => Some(*value),
            FieldValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn message(&self, name: &str) -> Option<&Record> {
        match self.get(name)? {
            FieldValue::Message(value) => value.as_ref(),
            _ => None,
        }
    }

    /// Repeated-message field; empty when absent.
    pub fn messages(&self, name: &str) -> &[Record] {
        match self.get(name) {
            Some(FieldValue::Messages(values)) => values,
            _ => &[],
        }
    }

    /// String elements of a repeated-scalar field.
    pub fn strings(&self, name: &str) -> Vec<&str> {
        match self.get(name) {
            Some(FieldValue::Repeated(values)) => values
                .iter()
                .filter_map(|value| match value {
                    FieldValue::Str(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn enum_value(&self, name: &str) -> Option<&EnumValue> {
        match self.get(name)? {
            FieldValue::Enum(value) => Some(value),
            _ => None,
        }
    }
}
