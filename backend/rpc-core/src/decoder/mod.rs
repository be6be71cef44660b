//! Schema-driven positional decoder.
//!
//! Walks a JSON array against a [`Schema`] and produces a [`Record`]:
//!
//! - `array[index]` beyond the end, or `null`, yields the field's zero value
//! - a present value of the wrong kind is a [`DecodeError::SchemaMismatch`]
//!   carrying the JSON path, field name and expected kind
//! - unknown enum numbers become [`EnumValue::Unknown`], not errors
//! - elements past the highest declared index are kept as trailing values
//!
//! Decoding is pure. The optional [`Diagnostics`] only observe.

use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::error::DecodeError;

use common::ErrorLocation;
use models::{EnumTable, EnumValue, FieldKind, FieldSpec, FieldValue, Record, ScalarType, Schema};

use std::panic::Location;
use std::sync::Arc;

use serde_json::Value;

const ROOT_PATH: &str = "$";

/// A typed message with a positional schema.
pub trait PositionalMessage: Sized {
    fn schema() -> Arc<Schema>;

    fn from_record(record: Record) -> Self;
}

pub fn decode(raw: &Value, schema: &Schema) -> Result<Record, DecodeError> {
    decode_with(raw, schema, &Diagnostics::disabled())
}

pub fn decode_with(
    raw: &Value,
    schema: &Schema,
    diagnostics: &Diagnostics,
) -> Result<Record, DecodeError> {
    let decoder = Decoder { diagnostics };
    match raw {
        Value::Null => decoder.record(&[], schema, ROOT_PATH),
        Value::Array(items) => decoder.record(items, schema, ROOT_PATH),
        other => Err(root_mismatch(
            schema,
            format!("array (message {})", schema.name()),
            other,
        )),
    }
}

/// Parse a JSON document, then decode it.
pub fn decode_slice(bytes: &[u8], schema: &Schema) -> Result<Record, DecodeError> {
    let raw: Value = serde_json::from_slice(bytes)?;
    decode(&raw, schema)
}

pub fn decode_message<T: PositionalMessage>(raw: &Value) -> Result<T, DecodeError> {
    decode(raw, &T::schema()).map(T::from_record)
}

pub fn decode_message_with<T: PositionalMessage>(
    raw: &Value,
    diagnostics: &Diagnostics,
) -> Result<T, DecodeError> {
    decode_with(raw, &T::schema(), diagnostics).map(T::from_record)
}

/// JSON type name used in mismatch errors.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

struct Decoder<'a> {
    diagnostics: &'a Diagnostics,
}

impl Decoder<'_> {
    fn record(&self, items: &[Value], schema: &Schema, path: &str) -> Result<Record, DecodeError> {
        let mut fields = Vec::with_capacity(schema.fields().len());
        for field_def in schema.fields() {
            let field_path = format!("{path}[{}]", field_def.index);
            let value = match items.get(field_def.index) {
                None | Some(Value::Null) => self.zero_value(field_def),
                Some(value) => self.field(value, field_def, schema, &field_path)?,
            };
            fields.push((field_def.name.clone(), value));
        }

        let declared = schema.max_index().map_or(0, |max| max + 1);
        let trailing = items.get(declared..).map(<[Value]>::to_vec).unwrap_or_default();
        if !trailing.is_empty() {
            self.diagnostics.emit(|| DiagnosticEvent::TrailingFieldsIgnored {
                schema: schema.name().to_string(),
                count: trailing.len(),
            });
        }

        Ok(Record::new(schema.name(), fields, trailing))
    }

    fn zero_record(&self, schema: &Schema, path: &str) -> Result<Record, DecodeError> {
        self.record(&[], schema, path)
    }

    fn zero_value(&self, field_def: &FieldSpec) -> FieldValue {
        match &field_def.kind {
            FieldKind::Scalar(scalar) => zero_scalar(*scalar),
            FieldKind::Message(_) => FieldValue::Message(None),
            FieldKind::RepeatedScalar(_) => FieldValue::Repeated(Vec::new()),
            FieldKind::RepeatedMessage(_) => FieldValue::Messages(Vec::new()),
            FieldKind::Enum(table) => FieldValue::Enum(lookup(table, 0)),
        }
    }

    /// Decode a present, non-null value.
    fn field(
        &self,
        value: &Value,
        field_def: &FieldSpec,
        schema: &Schema,
        path: &str,
    ) -> Result<FieldValue, DecodeError> {
        let mismatch_at = |path: String, found: &Value| field_mismatch(schema, field_def, path, found);

        match &field_def.kind {
            FieldKind::Scalar(scalar) => {
                scalar_value(value, *scalar).ok_or_else(|| mismatch_at(path.to_string(), value))
            }

            FieldKind::Message(nested) => match value {
                Value::Array(items) => Ok(FieldValue::Message(Some(self.record(
                    items, nested, path,
                )?))),
                other => Err(mismatch_at(path.to_string(), other)),
            },

            FieldKind::RepeatedScalar(scalar) => {
                let Value::Array(items) = value else {
                    return Err(mismatch_at(path.to_string(), value));
                };
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::Null => Ok(zero_scalar(*scalar)),
                        item => scalar_value(item, *scalar)
                            .ok_or_else(|| mismatch_at(format!("{path}[{i}]"), item)),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldValue::Repeated)
            }

            FieldKind::RepeatedMessage(nested) => {
                let Value::Array(items) = value else {
                    return Err(mismatch_at(path.to_string(), value));
                };
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let item_path = format!("{path}[{i}]");
                        match item {
                            Value::Array(inner) => self.record(inner, nested, &item_path),
                            Value::Null => self.zero_record(nested, &item_path),
                            other => Err(mismatch_at(item_path, other)),
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldValue::Messages)
            }

            FieldKind::Enum(table) => {
                let number = integer(value).ok_or_else(|| mismatch_at(path.to_string(), value))?;
                let enum_value = lookup(table, number);
                if !enum_value.is_known() {
                    self.diagnostics.emit(|| DiagnosticEvent::UnknownEnumValue {
                        schema: schema.name().to_string(),
                        field: field_def.name.clone(),
                        enum_name: table.name().to_string(),
                        number,
                    });
                }
                Ok(FieldValue::Enum(enum_value))
            }
        }
    }
}

fn zero_scalar(scalar: ScalarType) -> FieldValue {
    match scalar {
        ScalarType::String => FieldValue::Str(String::new()),
        ScalarType::Int => FieldValue::Int(0),
        ScalarType::Float => FieldValue::Float(0.0),
        ScalarType::Bool => FieldValue::Bool(false),
    }
}

fn scalar_value(value: &Value, scalar: ScalarType) -> Option<FieldValue> {
    match (scalar, value) {
        (ScalarType::String, Value::String(s)) => Some(FieldValue::Str(s.clone())),
        (ScalarType::Int, value) => integer(value).map(FieldValue::Int),
        (ScalarType::Float, Value::Number(n)) => n.as_f64().map(FieldValue::Float),
        (ScalarType::Bool, Value::Bool(b)) => Some(FieldValue::Bool(*b)),
        _ => None,
    }
}

/// Integers, and floats with no fractional part that fit in `i64`.
fn integer(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
        .map(|f| f as i64)
}

fn lookup(table: &EnumTable, number: i64) -> EnumValue {
    match table.lookup(number) {
        Some(name) => EnumValue::Known {
            number,
            name: name.to_string(),
        },
        None => EnumValue::Unknown(number),
    }
}

#[track_caller]
fn field_mismatch(schema: &Schema, field_def: &FieldSpec, path: String, found: &Value) -> DecodeError {
    DecodeError::SchemaMismatch {
        schema: schema.name().to_string(),
        field: Some(field_def.name.clone()),
        index: Some(field_def.index),
        path,
        expected: field_def.kind.describe(),
        found: json_type_name(found),
        location: ErrorLocation::from(Location::caller()),
    }
}

#[track_caller]
fn root_mismatch(schema: &Schema, expected: String, found: &Value) -> DecodeError {
    DecodeError::SchemaMismatch {
        schema: schema.name().to_string(),
        field: None,
        index: None,
        path: ROOT_PATH.to_string(),
        expected,
        found: json_type_name(found),
        location: ErrorLocation::from(Location::caller()),
    }
}
