//! Reflective field extraction
//!
//! Walks dotted field paths through a [`DynamicMessage`] using only its
//! descriptors. No per-kind code is involved: the same call pulls
//! `target.spec` out of any kind's stack input.

use crate::descriptor::MessageDescriptor;
use crate::error::ExtractError;
use crate::message::{DynamicMessage, join_path};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Path of the resource spec inside a stack input
pub const API_RESOURCE_SPEC_PATH: &str = "target.spec";
/// Path of the resource metadata inside a stack input
pub const API_RESOURCE_METADATA_PATH: &str = "target.metadata";

/// Extract the nested message at `path` (e.g. `"target.spec"`).
///
/// Fails with [`ExtractError::MissingField`] when a segment is not declared,
/// [`ExtractError::NilField`] when it is declared but unset, and
/// [`ExtractError::NotAMessage`] when it is not a singular message field.
pub fn extract_message(message: &DynamicMessage, path: &str) -> Result<DynamicMessage, ExtractError> {
    let segments = split(path)?;
    let (descriptor, fields) = walk(message, &segments)?;
    Ok(DynamicMessage::from_parts(
        message.registry().clone(),
        descriptor,
        fields.clone(),
    ))
}

/// Extract the raw value at `path`; the last segment may be any field type
pub fn extract_value<'a>(message: &'a DynamicMessage, path: &str) -> Result<&'a Value, ExtractError> {
    let segments = split(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(ExtractError::EmptyPath);
    };
    let (descriptor, fields) = walk(message, parents)?;
    let full_path = segments.join(".");

    if descriptor.field(last).is_none() {
        return Err(ExtractError::MissingField {
            message: descriptor.full_name.clone(),
            field: last.to_string(),
        });
    }
    fields
        .get(*last)
        .filter(|v| !v.is_null())
        .ok_or(ExtractError::NilField { path: full_path })
}

/// The `target.spec` message of a stack input
pub fn extract_api_resource_spec(stack_input: &DynamicMessage) -> Result<DynamicMessage, ExtractError> {
    extract_message(stack_input, API_RESOURCE_SPEC_PATH)
}

/// The `target.metadata` message of a stack input
pub fn extract_api_resource_metadata(
    stack_input: &DynamicMessage,
) -> Result<DynamicMessage, ExtractError> {
    extract_message(stack_input, API_RESOURCE_METADATA_PATH)
}

fn split(path: &str) -> Result<Vec<&str>, ExtractError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ExtractError::EmptyPath);
    }
    Ok(path.split('.').collect())
}

fn walk<'a>(
    root: &'a DynamicMessage,
    segments: &[&str],
) -> Result<(Arc<MessageDescriptor>, &'a Map<String, Value>), ExtractError> {
    let registry = root.registry();
    let mut descriptor = root.descriptor_arc();
    let mut fields = root.fields();
    let mut path = String::new();

    for segment in segments {
        let field = descriptor
            .field(segment)
            .ok_or_else(|| ExtractError::MissingField {
                message: descriptor.full_name.clone(),
                field: segment.to_string(),
            })?;
        path = join_path(&path, segment);

        if !field.is_singular_message() {
            return Err(ExtractError::NotAMessage { path });
        }
        let nested = field
            .type_ref
            .as_deref()
            .and_then(|r| registry.message(r))
            .ok_or_else(|| ExtractError::NotAMessage { path: path.clone() })?;
        let value = fields
            .get(*segment)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ExtractError::NilField { path: path.clone() })?;
        fields = value
            .as_object()
            .ok_or_else(|| ExtractError::NotAMessage { path: path.clone() })?;
        descriptor = nested;
    }

    Ok((descriptor, fields))
}
