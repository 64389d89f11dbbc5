//! `--set key=value` overrides
//!
//! Sets a manifest field by dotted path, converting the string value to the
//! field's type. Intermediate messages are created when absent. The last
//! segment may also address a string map entry, e.g.
//! `metadata.labels.team=platform`.

use crate::descriptor::{FieldDescriptor, FieldType, MessageDescriptor};
use crate::error::OverrideError;
use crate::message::{DynamicMessage, join_path, lookup_field};
use crate::registry::SchemaRegistry;
use serde_json::{Map, Number, Value};
use std::str::FromStr;
use tracing::debug;

/// One parsed `key=value` override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueOverride {
    pub path: String,
    pub value: String,
}

impl FromStr for ValueOverride {
    type Err = OverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, value) = s
            .split_once('=')
            .ok_or_else(|| OverrideError::InvalidSyntax(s.to_string()))?;
        let path = path.trim();
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(OverrideError::InvalidSyntax(s.to_string()));
        }
        Ok(Self {
            path: path.to_string(),
            value: value.to_string(),
        })
    }
}

/// Apply overrides in order; later overrides win
pub fn apply_overrides(
    message: &mut DynamicMessage,
    overrides: &[ValueOverride],
) -> Result<(), OverrideError> {
    let registry = message.registry().clone();
    let descriptor = message.descriptor_arc();
    for o in overrides {
        let segments: Vec<&str> = o.path.split('.').collect();
        set_path(&registry, &descriptor, message.fields_mut(), &segments, "", &o.value)?;
        debug!(path = %o.path, "Applied override");
    }
    Ok(())
}

fn set_path(
    registry: &SchemaRegistry,
    descriptor: &MessageDescriptor,
    fields: &mut Map<String, Value>,
    segments: &[&str],
    prefix: &str,
    raw: &str,
) -> Result<(), OverrideError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(());
    };
    let path = join_path(prefix, head);
    let field = lookup_field(descriptor, head).ok_or_else(|| OverrideError::UnknownField {
        path: path.clone(),
    })?;

    if rest.is_empty() {
        let value = convert(registry, field, raw, &path)?;
        fields.insert(field.name.clone(), value);
        return Ok(());
    }

    match field.field_type {
        FieldType::StringMap if rest.len() == 1 && !field.repeated => {
            let entry = fields
                .entry(field.name.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(map) = entry {
                map.insert(rest[0].to_string(), Value::String(raw.to_string()));
            }
            Ok(())
        }
        FieldType::Message if !field.repeated => {
            let nested = field
                .type_ref
                .as_deref()
                .and_then(|r| registry.message(r))
                .ok_or_else(|| OverrideError::UnknownField { path: path.clone() })?;
            let entry = fields
                .entry(field.name.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            match entry {
                Value::Object(map) => set_path(registry, &nested, map, rest, &path, raw),
                _ => Ok(()),
            }
        }
        _ => Err(OverrideError::Unsupported {
            path: join_path(&path, &rest.join(".")),
            reason: format!("{path} is a {} field", field.type_name()),
        }),
    }
}

fn convert(
    registry: &SchemaRegistry,
    field: &FieldDescriptor,
    raw: &str,
    path: &str,
) -> Result<Value, OverrideError> {
    if field.repeated {
        let items = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|item| convert_single(registry, field, item, path))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::Array(items));
    }
    convert_single(registry, field, raw, path)
}

fn convert_single(
    registry: &SchemaRegistry,
    field: &FieldDescriptor,
    raw: &str,
    path: &str,
) -> Result<Value, OverrideError> {
    let invalid = |expected: &str| OverrideError::InvalidValue {
        path: path.to_string(),
        value: raw.to_string(),
        expected: expected.to_string(),
    };
    let trimmed = raw.trim();

    match field.field_type {
        FieldType::String => Ok(Value::String(raw.to_string())),
        FieldType::Int => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid("an integer")),
        FieldType::Uint => trimmed
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid("a non-negative integer")),
        FieldType::Double => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("a number")),
        FieldType::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid("true or false")),
        },
        FieldType::Enum => {
            let enum_type = field
                .type_ref
                .as_deref()
                .and_then(|r| registry.enum_type(r))
                .ok_or_else(|| invalid("an enum value"))?;
            if enum_type.contains(trimmed) {
                Ok(Value::String(trimmed.to_string()))
            } else {
                Err(invalid(&format!("one of {}", enum_type.values.join(", "))))
            }
        }
        FieldType::Message | FieldType::StringMap => Err(OverrideError::Unsupported {
            path: path.to_string(),
            reason: format!("{} fields cannot be set from a single value", field.type_name()),
        }),
    }
}
