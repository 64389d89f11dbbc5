//! Descriptor-backed dynamic messages
//!
//! A [`DynamicMessage`] is a JSON object checked against a
//! [`MessageDescriptor`]. Decoding is strict the way protobuf JSON decoding
//! is strict: unknown fields, wrong scalar types and unknown enum names are
//! errors. Field names may be written in camelCase or snake_case; the
//! decoded message always uses the camelCase names.

use crate::descriptor::{FieldDescriptor, FieldType, MessageDescriptor};
use crate::error::DecodeError;
use crate::naming::to_camel_case;
use crate::registry::SchemaRegistry;
use serde_json::{Map, Number, Value};
use std::sync::Arc;

/// A decoded message together with its descriptor
#[derive(Debug, Clone)]
pub struct DynamicMessage {
    registry: SchemaRegistry,
    descriptor: Arc<MessageDescriptor>,
    fields: Map<String, Value>,
}

impl DynamicMessage {
    /// An empty message of the given type
    pub fn new(registry: &SchemaRegistry, message: &str) -> Result<Self, DecodeError> {
        let descriptor = registry
            .message(message)
            .ok_or_else(|| DecodeError::UnknownMessage(message.to_string()))?;
        Ok(Self {
            registry: registry.clone(),
            descriptor,
            fields: Map::new(),
        })
    }

    /// Decode a JSON value into a message of the given type
    pub fn decode(
        registry: &SchemaRegistry,
        message: &str,
        value: &Value,
    ) -> Result<Self, DecodeError> {
        let descriptor = registry
            .message(message)
            .ok_or_else(|| DecodeError::UnknownMessage(message.to_string()))?;
        let fields = decode_message(registry, &descriptor, value, "")?;
        Ok(Self {
            registry: registry.clone(),
            descriptor,
            fields,
        })
    }

    /// Decode a single YAML document into a message of the given type
    pub fn from_yaml(
        registry: &SchemaRegistry,
        message: &str,
        yaml: &str,
    ) -> Result<Self, DecodeError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::decode(registry, message, &value)
    }

    pub(crate) fn from_parts(
        registry: SchemaRegistry,
        descriptor: Arc<MessageDescriptor>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            registry,
            descriptor,
            fields,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    pub(crate) fn descriptor_arc(&self) -> Arc<MessageDescriptor> {
        Arc::clone(&self.descriptor)
    }

    pub fn full_name(&self) -> &str {
        &self.descriptor.full_name
    }

    /// Raw value of a field, `None` when the field is absent
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether the field holds a non-default value
    pub fn is_populated(&self, field: &str) -> bool {
        match (self.descriptor.field(field), self.fields.get(field)) {
            (Some(descriptor), Some(value)) => is_populated(&self.registry, descriptor, value),
            _ => false,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.fields)
    }
}

/// Whether `value` differs from the zero value of `field`.
///
/// Singular message fields count as populated as soon as they are present,
/// even when empty.
pub(crate) fn is_populated(registry: &SchemaRegistry, field: &FieldDescriptor, value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) if field.field_type == FieldType::Enum && !field.repeated => {
            let zero = field
                .type_ref
                .as_deref()
                .and_then(|r| registry.enum_type(r))
                .and_then(|e| e.zero_value());
            !s.is_empty() && zero != Some(s.as_str())
        }
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => field.is_singular_message() || !map.is_empty(),
    }
}

pub(crate) fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Find a field by its camelCase or snake_case name
pub(crate) fn lookup_field<'a>(
    descriptor: &'a MessageDescriptor,
    name: &str,
) -> Option<&'a FieldDescriptor> {
    descriptor
        .field(name)
        .or_else(|| descriptor.field(&to_camel_case(name)))
}

fn decode_message(
    registry: &SchemaRegistry,
    descriptor: &MessageDescriptor,
    value: &Value,
    path: &str,
) -> Result<Map<String, Value>, DecodeError> {
    let object = value.as_object().ok_or_else(|| DecodeError::NotAnObject {
        path: display_path(path),
        message: descriptor.full_name.clone(),
        found: describe(value),
    })?;

    let mut fields = Map::new();
    for (key, raw) in object {
        let field = lookup_field(descriptor, key).ok_or_else(|| DecodeError::UnknownField {
            path: display_path(path),
            field: key.clone(),
            message: descriptor.full_name.clone(),
        })?;
        if raw.is_null() {
            continue;
        }
        let field_path = join_path(path, &field.name);
        let decoded = if field.repeated {
            let items = raw.as_array().ok_or_else(|| DecodeError::TypeMismatch {
                path: field_path.clone(),
                expected: "a list",
                found: describe(raw).to_string(),
            })?;
            let decoded = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    decode_single(registry, field, item, &format!("{field_path}[{i}]"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(decoded)
        } else {
            decode_single(registry, field, raw, &field_path)?
        };
        fields.insert(field.name.clone(), decoded);
    }
    Ok(fields)
}

fn decode_single(
    registry: &SchemaRegistry,
    field: &FieldDescriptor,
    raw: &Value,
    path: &str,
) -> Result<Value, DecodeError> {
    let mismatch = |expected: &'static str| DecodeError::TypeMismatch {
        path: path.to_string(),
        expected,
        found: describe(raw).to_string(),
    };

    match field.field_type {
        FieldType::String => match raw {
            Value::String(_) => Ok(raw.clone()),
            _ => Err(mismatch("a string")),
        },
        FieldType::Bool => match raw {
            Value::Bool(_) => Ok(raw.clone()),
            _ => Err(mismatch("a boolean")),
        },
        FieldType::Int => parse_int(raw)
            .map(Value::from)
            .ok_or_else(|| mismatch("an integer")),
        FieldType::Uint => parse_int(raw)
            .and_then(|n| u64::try_from(n).ok())
            .map(Value::from)
            .ok_or_else(|| mismatch("a non-negative integer")),
        FieldType::Double => parse_double(raw)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| mismatch("a number")),
        FieldType::Enum => {
            let reference = field.type_ref.as_deref().unwrap_or_default();
            let enum_type = registry
                .enum_type(reference)
                .ok_or_else(|| DecodeError::UnknownMessage(reference.to_string()))?;
            match raw {
                Value::String(name) if enum_type.contains(name) => Ok(raw.clone()),
                Value::String(name) => Err(DecodeError::UnknownEnumValue {
                    path: path.to_string(),
                    value: name.clone(),
                    enum_name: enum_type.full_name.clone(),
                }),
                // Unknown numbers are kept so that validation can report them
                Value::Number(n) => Ok(n
                    .as_u64()
                    .and_then(|i| enum_type.by_number(i))
                    .map(|name| Value::String(name.to_string()))
                    .unwrap_or_else(|| raw.clone())),
                _ => Err(mismatch("an enum name")),
            }
        }
        FieldType::Message => {
            let reference = field.type_ref.as_deref().unwrap_or_default();
            let nested = registry
                .message(reference)
                .ok_or_else(|| DecodeError::UnknownMessage(reference.to_string()))?;
            decode_message(registry, &nested, raw, path).map(Value::Object)
        }
        FieldType::StringMap => {
            let object = raw.as_object().ok_or_else(|| mismatch("a string map"))?;
            for (key, value) in object {
                if !value.is_string() {
                    return Err(DecodeError::TypeMismatch {
                        path: format!("{path}[{key}]"),
                        expected: "a string",
                        found: describe(value).to_string(),
                    });
                }
            }
            Ok(raw.clone())
        }
    }
}

/// Integers may be written as numbers or, like 64-bit protobuf JSON values,
/// as strings. Floats with no fractional part are accepted.
fn parse_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_double(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}
